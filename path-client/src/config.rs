//! Client configuration

use crate::{ClientResult, HttpClient};

/// Default collaborator service
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client configuration for connecting to the patient service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:5000")
    pub base_url: String,

    /// Base URL of the external health-record system, when it is served
    /// separately. Defaults to `base_url`.
    pub external_base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            external_base_url: None,
            timeout: 30,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Point external autofill at a different host
    pub fn with_external_base_url(mut self, url: impl Into<String>) -> Self {
        self.external_base_url = Some(url.into());
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> ClientResult<HttpClient> {
        HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout, 30);
        assert!(config.external_base_url.is_none());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("http://lab.local")
            .with_timeout(5)
            .with_external_base_url("http://his.local");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.external_base_url.as_deref(), Some("http://his.local"));
    }
}
