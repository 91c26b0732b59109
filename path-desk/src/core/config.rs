use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use path_client::{ClientConfig, DEFAULT_BASE_URL};
use path_printer::LabelFormat;
use shared::DecomposePolicy;
use tracing::warn;

/// Desk configuration - every setting of the label desk
///
/// # Environment variables
///
/// Every field can be set through the environment (a `.env` file is loaded
/// at startup):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | API_BASE_URL | http://localhost:5000 | Patient service |
/// | HIS_BASE_URL | API_BASE_URL | External health-record system |
/// | REQUEST_TIMEOUT | 30 | Request timeout (seconds) |
/// | ORG_CODE | APH | Organisation shown in the label caption |
/// | LABEL_FORMAT | a | Label stock: `a` (63.5×38.1mm) or `b` (43.5×18.1mm) |
/// | SPOOL_DIR | system temp dir | Directory print surfaces are created in |
/// | PRINT_COMMAND | lp | Platform print command |
/// | PRINTER_NAME | - | Print queue passed to the print command |
/// | PRINTER_ADDR | - | `host:port` of a raw ESC/POS label printer |
/// | PRINTER_DOTS_PER_MM | 8 | Head resolution of that printer |
/// | PRINT_SETTLE_MS | 500 | Time a surface outlives its print call |
/// | DECOMPOSE_POLICY | strip-first-occurrence | Path id recovery policy |
/// | USER_ID | - | Issuing user recorded with each patient |
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | - | Directory for daily log files |
///
/// # Example
///
/// ```ignore
/// LABEL_FORMAT=b PRINTER_NAME=Zebra_GK420 path-desk reprint 0042
/// ```
#[derive(Debug, Clone)]
pub struct DeskConfig {
    pub api_base_url: String,
    pub his_base_url: Option<String>,
    /// Request timeout in seconds
    pub request_timeout: u64,
    pub org_code: String,
    pub label_format: LabelFormat,
    /// Anchor directory for print surfaces
    pub spool_dir: PathBuf,
    pub print_command: String,
    pub printer_name: Option<String>,
    /// When set, labels go straight to this printer over TCP
    pub printer_addr: Option<String>,
    pub printer_dots_per_mm: f32,
    pub print_settle_ms: u64,
    pub decompose_policy: DecomposePolicy,
    pub user_id: Option<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Variables that were set but unparsable, so their default applies
    pub rejected: Vec<&'static str>,
}

impl DeskConfig {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to their defaults; the
    /// unparsable ones are listed in `rejected`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut rejected = Vec::new();

        let request_timeout = parsed(&var, "REQUEST_TIMEOUT", &mut rejected).unwrap_or(30);
        let label_format = parsed(&var, "LABEL_FORMAT", &mut rejected).unwrap_or_default();
        let printer_dots_per_mm =
            match parsed::<f32>(&var, "PRINTER_DOTS_PER_MM", &mut rejected) {
                Some(d) if d > 0.0 => d,
                Some(_) => {
                    rejected.push("PRINTER_DOTS_PER_MM");
                    path_printer::DEFAULT_DOTS_PER_MM
                }
                None => path_printer::DEFAULT_DOTS_PER_MM,
            };
        let print_settle_ms = parsed(&var, "PRINT_SETTLE_MS", &mut rejected).unwrap_or(500);
        let decompose_policy =
            parsed(&var, "DECOMPOSE_POLICY", &mut rejected).unwrap_or_default();

        Self {
            api_base_url: var("API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            his_base_url: var("HIS_BASE_URL"),
            request_timeout,
            org_code: var("ORG_CODE").unwrap_or_else(|| "APH".into()),
            label_format,
            spool_dir: var("SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            print_command: var("PRINT_COMMAND").unwrap_or_else(|| "lp".into()),
            printer_name: var("PRINTER_NAME"),
            printer_addr: var("PRINTER_ADDR"),
            printer_dots_per_mm,
            print_settle_ms,
            decompose_policy,
            user_id: var("USER_ID"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR"),
            rejected,
        }
    }

    /// Warn about every variable that fell back to its default.
    ///
    /// Called once logging is up, since configuration loads before it.
    pub fn warn_rejected(&self) {
        for &key in &self.rejected {
            warn!(key, "Invalid value in environment, using the default");
        }
    }

    /// Client configuration for the patient service
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.api_base_url).with_timeout(self.request_timeout);
        match &self.his_base_url {
            Some(url) => config.with_external_base_url(url),
            None => config,
        }
    }

    pub fn print_settle(&self) -> Duration {
        Duration::from_millis(self.print_settle_ms)
    }
}

/// Parse `key`, recording it in `rejected` when set but unparsable
fn parsed<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    key: &'static str,
    rejected: &mut Vec<&'static str>,
) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            rejected.push(key);
            None
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
