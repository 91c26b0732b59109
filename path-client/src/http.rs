//! HTTP client for the patient service

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::models::{AddPatientResponse, ExternalPatient, NewPatient, PatientRecord, PrefixEntry};
use tracing::{debug, instrument, warn};

use crate::{ClientConfig, ClientError, ClientResult};

/// Error body the service sends alongside a failure status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for making requests to the patient service
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    external_base_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        let base_url = parse_base(&config.base_url)?;
        let external_base_url = match &config.external_base_url {
            Some(url) => parse_base(url)?,
            None => base_url.clone(),
        };

        Ok(Self {
            client,
            base_url,
            external_base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to a base URL, percent-encoding each one
    fn url(base: &Url, segments: &[&str]) -> ClientResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> ClientResult<T> {
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            warn!(status = status.as_u16(), ?message, "Request failed");

            return match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(message.unwrap_or_default())),
                StatusCode::BAD_REQUEST => {
                    Err(ClientError::Validation(message.unwrap_or_default()))
                }
                _ => Err(ClientError::Api {
                    status: status.as_u16(),
                    message,
                }),
            };
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }

    // ========== Prefix catalog ==========

    /// Every prefix in the catalog, active or not
    #[instrument(skip(self))]
    pub async fn prefix_catalog(&self) -> ClientResult<Vec<PrefixEntry>> {
        let url = Self::url(&self.base_url, &["api", "master", "get-prefixes"])?;
        self.get(url).await
    }

    // ========== Patients ==========

    /// Save a new patient record
    #[instrument(skip(self, patient), fields(barcode = %patient.composite_barcode))]
    pub async fn add_patient(&self, patient: &NewPatient) -> ClientResult<AddPatientResponse> {
        let url = Self::url(&self.base_url, &["api", "patients", "add-patient"])?;
        self.post(url, patient).await
    }

    /// Fetch the record stored under a composite key
    #[instrument(skip(self))]
    pub async fn patient_by_composite(
        &self,
        prefix: &str,
        path_id: &str,
    ) -> ClientResult<PatientRecord> {
        let url = Self::url(
            &self.base_url,
            &["api", "patients", "get-patient", prefix, path_id],
        )?;
        // The service answers `null` rather than 404 for an unknown key
        self.get::<Option<PatientRecord>>(url)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("{prefix}{path_id}")))
    }

    /// Every prefix a path id has been issued under
    #[instrument(skip(self))]
    pub async fn prefixes_for_path_id(&self, path_id: &str) -> ClientResult<Vec<String>> {
        let url = Self::url(&self.base_url, &["api", "patients", "get-prefixes", path_id])?;
        self.get(url).await
    }

    // ========== External health records ==========

    /// Demographics from the external health-record system
    #[instrument(skip(self))]
    pub async fn external_patient(&self, health_id: &str) -> ClientResult<ExternalPatient> {
        let url = Self::url(&self.external_base_url, &["api", "his", "patient", health_id])?;
        self.get(url).await
    }
}

fn parse_base(url: &str) -> ClientResult<Url> {
    let parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_segments() {
        let base = parse_base("http://localhost:5000/").unwrap();
        let segments = ["api", "patients", "get-patient", "PTH", "00 42/x"];
        let url = HttpClient::url(&base, &segments).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/patients/get-patient/PTH/00%2042%2Fx"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let base = parse_base("http://lab.local/backend").unwrap();
        let url = HttpClient::url(&base, &["api", "master", "get-prefixes"]).unwrap();
        assert_eq!(url.as_str(), "http://lab.local/backend/api/master/get-prefixes");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpClient::new(&ClientConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));

        let err = HttpClient::new(&ClientConfig::new("mailto:lab@example.com")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }
}
