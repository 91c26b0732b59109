//! Path Client - HTTP client for the patient service
//!
//! Provides the collaborator calls the label desk makes: prefix catalog,
//! patient save and lookup, prefix lookup by path id and external
//! health-record autofill.

pub mod config;
pub mod directory;
pub mod error;
pub mod http;

pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use directory::{PatientDirectory, PatientRegistry};
pub use error::{ClientError, ClientResult, FETCH_FALLBACK, SAVE_FALLBACK};
pub use http::HttpClient;
