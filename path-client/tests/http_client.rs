// path-client/tests/http_client.rs
// Client against an in-process patient service

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use path_client::{
    ClientConfig, ClientError, HttpClient, PatientDirectory, SAVE_FALLBACK,
};
use serde_json::{Value, json};
use shared::models::{Gender, IssuanceStamp, NewPatient, PrefixStatus};
use shared::{ErrorCode, LabelIdentifier};

#[derive(Default)]
struct Service {
    saved: Mutex<Vec<Value>>,
}

fn record(prefix: &str, path_id: &str) -> Value {
    json!({
        "_id": "65f0c0ffee",
        "prefix": prefix,
        "pathId": path_id,
        "uhid": "UH-778",
        "patientName": "Asha Rao",
        "age": "42",
        "gender": "female",
        "barcode": format!("{prefix}{path_id}"),
        "date": "2024-03-07",
        "time": "3:07:09 PM",
        "userId": "u-1"
    })
}

fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route(
            "/api/master/get-prefixes",
            get(|| async {
                Json(json!([
                    { "_id": "1", "prefix": "PTH", "description": "Pathology", "status": "Active" },
                    { "_id": "2", "prefix": "OLD", "description": "Retired", "status": "Inactive" }
                ]))
            }),
        )
        .route(
            "/api/patients/add-patient",
            post(
                |State(service): State<Arc<Service>>, Json(body): Json<Value>| async move {
                    if body["pathId"] == "dup" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "message": "Path ID already exists" })),
                        );
                    }
                    if body["pathId"] == "boom" {
                        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
                    }
                    service.saved.lock().push(body);
                    (
                        StatusCode::OK,
                        Json(json!({ "message": "Patient added successfully" })),
                    )
                },
            ),
        )
        .route(
            "/api/patients/get-patient/{prefix}/{path_id}",
            get(|Path((prefix, path_id)): Path<(String, String)>| async move {
                match (prefix.as_str(), path_id.as_str()) {
                    ("PTH", "0042") | ("LAB", "0042") | ("PTH", "A 1/2") => {
                        Json(record(&prefix, &path_id))
                    }
                    _ => Json(Value::Null),
                }
            }),
        )
        .route(
            "/api/patients/get-prefixes/{path_id}",
            get(|Path(path_id): Path<String>| async move {
                match path_id.as_str() {
                    "0042" => Json(json!(["PTH", "LAB"])),
                    _ => Json(json!([])),
                }
            }),
        )
        .route(
            "/api/his/patient/{uhid}",
            get(|Path(uhid): Path<String>| async move {
                if uhid == "UH-778" {
                    Ok(Json(json!({ "name": "Asha Rao", "age": 42, "genderCode": "f" })))
                } else {
                    Err((StatusCode::NOT_FOUND, Json(json!({ "message": "No such UHID" }))))
                }
            }),
        )
        .with_state(service)
}

async fn spawn_service() -> (HttpClient, Arc<Service>) {
    let service = Arc::new(Service::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(service.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ClientConfig::new(format!("http://{addr}"))
        .with_timeout(5)
        .build_http_client()
        .unwrap();
    (client, service)
}

#[tokio::test]
async fn test_prefix_catalog() {
    let (client, _) = spawn_service().await;
    let catalog = client.prefix_catalog().await.unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].id, "1");
    assert_eq!(catalog[0].prefix, "PTH");
    assert_eq!(catalog[1].status, PrefixStatus::Inactive);
    assert_eq!(shared::models::active_prefixes(&catalog).len(), 1);
}

#[tokio::test]
async fn test_add_patient_sends_service_wire_names() {
    let (client, service) = spawn_service().await;
    let id = LabelIdentifier::new("PTH", "0042").unwrap();
    let stamp = IssuanceStamp {
        date: "2024-03-07".into(),
        time: "3:07:09 PM".into(),
    };
    let patient = NewPatient::issue(&id, "UH-778", "Asha Rao", 42, Gender::Female, stamp, None);

    let response = client.add_patient(&patient).await.unwrap();
    assert_eq!(response.message, "Patient added successfully");

    let saved = service.saved.lock();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["pathId"], "0042");
    assert_eq!(saved[0]["uhid"], "UH-778");
    assert_eq!(saved[0]["barcode"], "PTH0042");
    assert_eq!(saved[0]["patientName"], "Asha Rao");
    assert_eq!(saved[0]["gender"], "female");
}

#[tokio::test]
async fn test_add_patient_passes_server_message_through() {
    let (client, _) = spawn_service().await;
    let id = LabelIdentifier::new("PTH", "dup").unwrap();
    let patient = NewPatient::issue(
        &id,
        "",
        "X",
        1,
        Gender::Other,
        IssuanceStamp::now(),
        None,
    );

    let err = client.add_patient(&patient).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 409, .. }));
    let app = err.into_app_error(SAVE_FALLBACK);
    assert_eq!(app.message, "Path ID already exists");
    assert_eq!(app.code, ErrorCode::NetworkError);
}

#[tokio::test]
async fn test_add_patient_falls_back_without_message() {
    let (client, _) = spawn_service().await;
    let id = LabelIdentifier::new("PTH", "boom").unwrap();
    let patient = NewPatient::issue(
        &id,
        "",
        "X",
        1,
        Gender::Other,
        IssuanceStamp::now(),
        None,
    );

    let err = client.add_patient(&patient).await.unwrap_err();
    assert_eq!(err.into_app_error(SAVE_FALLBACK).message, SAVE_FALLBACK);
}

#[tokio::test]
async fn test_patient_by_composite() {
    let (client, _) = spawn_service().await;
    let record = client.patient_by_composite("PTH", "0042").await.unwrap();

    assert_eq!(record.id.as_deref(), Some("65f0c0ffee"));
    assert_eq!(record.local_id, "0042");
    assert_eq!(record.composite_barcode, "PTH0042");
    assert_eq!(record.age, 42);
    assert_eq!(record.gender, Gender::Female);
}

#[tokio::test]
async fn test_path_id_is_percent_encoded() {
    let (client, _) = spawn_service().await;
    let record = client.patient_by_composite("PTH", "A 1/2").await.unwrap();
    assert_eq!(record.local_id, "A 1/2");
}

#[tokio::test]
async fn test_unknown_composite_is_not_found() {
    let (client, _) = spawn_service().await;
    let err = client.patient_by_composite("PTH", "9999").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_directory_lookups() {
    let (client, _) = spawn_service().await;
    let directory: &dyn PatientDirectory = &client;

    assert_eq!(directory.prefixes_for("0042").await.unwrap(), vec!["PTH", "LAB"]);
    assert!(directory.prefixes_for("9999").await.unwrap().is_empty());

    let record = directory.record("LAB", "0042").await.unwrap();
    assert_eq!(record.composite_barcode, "LAB0042");
}

#[tokio::test]
async fn test_external_patient() {
    let (client, _) = spawn_service().await;
    let external = client.external_patient("UH-778").await.unwrap();
    assert_eq!(external.name, "Asha Rao");
    assert_eq!(external.age, 42);
    assert_eq!(external.gender(), Gender::Female);

    let err = client.external_patient("UH-000").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref m) if m == "No such UHID"));
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    // Bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpClient::new(&ClientConfig::new(format!("http://{addr}")).with_timeout(2))
        .unwrap();
    let err = client.prefix_catalog().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
