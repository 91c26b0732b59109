//! Collaborator seams the desk flows depend on
//!
//! [`PatientDirectory`] is the read side used to resolve reprints,
//! [`PatientRegistry`] the intake side (catalog, save, autofill). Both are
//! implemented by [`HttpClient`]; tests substitute in-memory fakes.

use async_trait::async_trait;
use shared::models::{AddPatientResponse, ExternalPatient, NewPatient, PatientRecord, PrefixEntry};

use crate::{ClientResult, HttpClient};

/// Read side of the patient service used to resolve reprints
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Prefixes a path id has ever been issued under
    async fn prefixes_for(&self, path_id: &str) -> ClientResult<Vec<String>>;

    /// The record stored under `(prefix, path_id)`
    async fn record(&self, prefix: &str, path_id: &str) -> ClientResult<PatientRecord>;
}

/// Intake side of the patient service
#[async_trait]
pub trait PatientRegistry: Send + Sync {
    async fn catalog(&self) -> ClientResult<Vec<PrefixEntry>>;

    async fn save(&self, patient: &NewPatient) -> ClientResult<AddPatientResponse>;

    /// Demographics for autofill, keyed by external health id
    async fn external(&self, health_id: &str) -> ClientResult<ExternalPatient>;
}

#[async_trait]
impl PatientDirectory for HttpClient {
    async fn prefixes_for(&self, path_id: &str) -> ClientResult<Vec<String>> {
        self.prefixes_for_path_id(path_id).await
    }

    async fn record(&self, prefix: &str, path_id: &str) -> ClientResult<PatientRecord> {
        self.patient_by_composite(prefix, path_id).await
    }
}

#[async_trait]
impl PatientRegistry for HttpClient {
    async fn catalog(&self) -> ClientResult<Vec<PrefixEntry>> {
        self.prefix_catalog().await
    }

    async fn save(&self, patient: &NewPatient) -> ClientResult<AddPatientResponse> {
        self.add_patient(patient).await
    }

    async fn external(&self, health_id: &str) -> ClientResult<ExternalPatient> {
        self.external_patient(health_id).await
    }
}
