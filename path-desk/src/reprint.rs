//! Reprint resolution
//!
//! A path id alone is ambiguous once it has been issued under more than one
//! prefix. Resolution therefore runs in two phases: first list every prefix
//! the path id was issued under and let the operator pick one, then fetch
//! the single record stored under that composite key.
//!
//! ```text
//! Idle -> PrefixesLoading -> PrefixesResolved -> RecordLoading -> RecordResolved
//!                        \-> NotFound                        \-> NotFound
//! ```

use path_client::{ClientError, FETCH_FALLBACK, PatientDirectory};
use shared::models::PatientRecord;
use shared::{AppError, AppResult};
use tracing::{debug, info, instrument, warn};

/// Where a reprint lookup currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum ReprintState {
    Idle,
    PrefixesLoading {
        path_id: String,
    },
    /// Candidate prefixes are known; `selected` is set once the operator
    /// has chosen (or there was only one candidate)
    PrefixesResolved {
        path_id: String,
        prefixes: Vec<String>,
        selected: Option<usize>,
    },
    RecordLoading {
        path_id: String,
        prefix: String,
    },
    RecordResolved(PatientRecord),
    NotFound {
        path_id: String,
        prefix: Option<String>,
    },
}

/// Two-phase reprint lookup against a patient directory
pub struct ReprintResolver<D: PatientDirectory> {
    directory: D,
    state: ReprintState,
}

impl<D: PatientDirectory> ReprintResolver<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            state: ReprintState::Idle,
        }
    }

    pub fn state(&self) -> &ReprintState {
        &self.state
    }

    /// Back to `Idle`, forgetting any previous lookup
    pub fn reset(&mut self) {
        self.state = ReprintState::Idle;
    }

    /// Phase one: every prefix `path_id` was issued under.
    ///
    /// An empty list is a not-found error and leaves the resolver in
    /// `NotFound`. A single prefix is selected automatically.
    #[instrument(skip(self))]
    pub async fn resolve_prefixes(&mut self, path_id: &str) -> AppResult<Vec<String>> {
        let path_id = path_id.trim();
        if path_id.is_empty() {
            return Err(
                AppError::validation("Please enter a Path ID.").with_detail("field", "pathId")
            );
        }

        self.state = ReprintState::PrefixesLoading {
            path_id: path_id.to_string(),
        };

        let prefixes = match self.directory.prefixes_for(path_id).await {
            Ok(prefixes) => prefixes,
            Err(ClientError::NotFound(_)) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Prefix lookup failed");
                self.state = ReprintState::Idle;
                return Err(e.into_app_error(FETCH_FALLBACK));
            }
        };

        if prefixes.is_empty() {
            info!("No prefixes issued for path id");
            self.state = ReprintState::NotFound {
                path_id: path_id.to_string(),
                prefix: None,
            };
            return Err(AppError::not_found(format!("Path ID {path_id}")));
        }

        debug!(?prefixes, "Prefixes resolved");
        let selected = (prefixes.len() == 1).then_some(0);
        self.state = ReprintState::PrefixesResolved {
            path_id: path_id.to_string(),
            prefixes: prefixes.clone(),
            selected,
        };
        Ok(prefixes)
    }

    /// Prefix to offer first: the current selection, else the first candidate
    pub fn highlighted(&self) -> Option<&str> {
        match &self.state {
            ReprintState::PrefixesResolved {
                prefixes, selected, ..
            } => prefixes.get(selected.unwrap_or(0)).map(String::as_str),
            _ => None,
        }
    }

    /// The operator's chosen prefix, if any
    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            ReprintState::PrefixesResolved {
                prefixes,
                selected: Some(i),
                ..
            } => prefixes.get(*i).map(String::as_str),
            _ => None,
        }
    }

    /// Choose one of the resolved prefixes
    pub fn select(&mut self, prefix: &str) -> AppResult<()> {
        let ReprintState::PrefixesResolved {
            prefixes, selected, ..
        } = &mut self.state
        else {
            return Err(AppError::validation("Resolve prefixes before selecting one"));
        };

        let index = prefixes
            .iter()
            .position(|p| p == prefix.trim())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Prefix {} was not issued for this Path ID",
                    prefix.trim()
                ))
                .with_detail("field", "prefix")
            })?;
        *selected = Some(index);
        Ok(())
    }

    /// Phase two: fetch the record for the selected prefix.
    ///
    /// Fails with a validation error unless prefixes are resolved and one is
    /// selected. A collaborator failure other than not-found keeps the
    /// selection so the operator can retry.
    #[instrument(skip(self))]
    pub async fn resolve_record(&mut self) -> AppResult<PatientRecord> {
        let (path_id, prefixes, index) = match &self.state {
            ReprintState::PrefixesResolved {
                path_id,
                prefixes,
                selected: Some(i),
            } => (path_id.clone(), prefixes.clone(), *i),
            ReprintState::PrefixesResolved { .. } => {
                return Err(AppError::validation("Please select a prefix first")
                    .with_detail("field", "prefix"));
            }
            _ => return Err(AppError::validation("Resolve prefixes before fetching a record")),
        };
        let prefix = prefixes[index].clone();

        self.state = ReprintState::RecordLoading {
            path_id: path_id.clone(),
            prefix: prefix.clone(),
        };

        match self.directory.record(&prefix, &path_id).await {
            Ok(record) => {
                info!(barcode = %record.composite_barcode, "Record resolved");
                self.state = ReprintState::RecordResolved(record.clone());
                Ok(record)
            }
            Err(ClientError::NotFound(_)) => {
                info!(%prefix, "No record for composite key");
                self.state = ReprintState::NotFound {
                    path_id: path_id.clone(),
                    prefix: Some(prefix.clone()),
                };
                Err(AppError::not_found(format!("Patient {prefix}{path_id}")))
            }
            Err(e) => {
                warn!(error = %e, "Record fetch failed");
                self.state = ReprintState::PrefixesResolved {
                    path_id,
                    prefixes,
                    selected: Some(index),
                };
                Err(e.into_app_error(FETCH_FALLBACK))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use path_client::ClientResult;
    use crate::label::LabelJob;
    use path_printer::LabelFormat;
    use shared::models::Gender;
    use shared::{DecomposePolicy, ErrorCode};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDirectory {
        issued: HashMap<String, Vec<String>>,
        offline: bool,
        lookup_missing: bool,
        age: Option<u32>,
        record_calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeDirectory {
        /// `(path_id, prefix)` issuances, in issue order
        fn with(issued: &[(&str, &str)]) -> Self {
            let mut directory = Self::default();
            for (path_id, prefix) in issued {
                directory
                    .issued
                    .entry(path_id.to_string())
                    .or_default()
                    .push(prefix.to_string());
            }
            directory
        }
    }

    #[async_trait]
    impl PatientDirectory for FakeDirectory {
        async fn prefixes_for(&self, path_id: &str) -> ClientResult<Vec<String>> {
            if self.lookup_missing {
                return Err(ClientError::NotFound(format!("/patients/{path_id}/prefixes")));
            }
            Ok(self.issued.get(path_id).cloned().unwrap_or_default())
        }

        async fn record(&self, prefix: &str, path_id: &str) -> ClientResult<PatientRecord> {
            self.record_calls
                .lock()
                .push((prefix.to_string(), path_id.to_string()));
            if self.offline {
                return Err(ClientError::Api {
                    status: 503,
                    message: None,
                });
            }
            let known = self
                .issued
                .get(path_id)
                .is_some_and(|ps| ps.iter().any(|p| p == prefix));
            if !known {
                return Err(ClientError::NotFound(String::new()));
            }
            Ok(PatientRecord {
                id: Some("r1".into()),
                prefix: prefix.into(),
                local_id: path_id.into(),
                external_health_id: "UH-1".into(),
                patient_name: "Asha Rao".into(),
                age: self.age.unwrap_or(42),
                gender: Gender::Female,
                composite_barcode: format!("{prefix}{path_id}"),
                date: "2024-03-07".into(),
                time: "3:07:09 PM".into(),
                user_id: None,
            })
        }
    }

    #[tokio::test]
    async fn test_two_prefixes_require_selection() {
        let mut resolver =
            ReprintResolver::new(FakeDirectory::with(&[("0042", "PTH"), ("0042", "LAB")]));

        let prefixes = resolver.resolve_prefixes("0042").await.unwrap();
        assert_eq!(prefixes, vec!["PTH", "LAB"]);
        assert_eq!(resolver.highlighted(), Some("PTH"));
        assert_eq!(resolver.selected(), None);

        let err = resolver.resolve_record().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(resolver.directory.record_calls.lock().is_empty());

        resolver.select("LAB").unwrap();
        let record = resolver.resolve_record().await.unwrap();
        assert_eq!(record.composite_barcode, "LAB0042");
        assert!(matches!(resolver.state(), ReprintState::RecordResolved(_)));
    }

    #[tokio::test]
    async fn test_no_prefixes_is_not_found_without_record_fetch() {
        let mut resolver = ReprintResolver::new(FakeDirectory::with(&[("0042", "PTH")]));

        let err = resolver.resolve_prefixes("9999").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(
            *resolver.state(),
            ReprintState::NotFound {
                path_id: "9999".into(),
                prefix: None
            }
        );

        let err = resolver.resolve_record().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(resolver.directory.record_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path_id_from_service_is_not_found() {
        let mut directory = FakeDirectory::with(&[("0042", "PTH")]);
        directory.lookup_missing = true;
        let mut resolver = ReprintResolver::new(directory);

        let err = resolver.resolve_prefixes("0042").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(
            *resolver.state(),
            ReprintState::NotFound {
                path_id: "0042".into(),
                prefix: None
            }
        );
    }

    #[tokio::test]
    async fn test_record_older_than_intake_range_reprints() {
        let mut directory = FakeDirectory::with(&[("0042", "PTH")]);
        directory.age = Some(100);
        let mut resolver = ReprintResolver::new(directory);

        resolver.resolve_prefixes("0042").await.unwrap();
        let record = resolver.resolve_record().await.unwrap();
        assert_eq!(record.age, 100);

        let label = LabelJob::from_record(
            &record,
            "ACME",
            LabelFormat::A,
            DecomposePolicy::default(),
        )
        .unwrap();
        assert_eq!(label.identifier.local_id, "0042");
    }

    #[tokio::test]
    async fn test_single_prefix_is_auto_selected() {
        let mut resolver = ReprintResolver::new(FakeDirectory::with(&[("0042", "PTH")]));

        resolver.resolve_prefixes(" 0042 ").await.unwrap();
        assert_eq!(resolver.selected(), Some("PTH"));

        let record = resolver.resolve_record().await.unwrap();
        assert_eq!(record.prefix, "PTH");
        assert_eq!(
            *resolver.directory.record_calls.lock(),
            vec![("PTH".to_string(), "0042".to_string())]
        );
    }

    #[tokio::test]
    async fn test_select_unknown_prefix_rejected() {
        let mut resolver =
            ReprintResolver::new(FakeDirectory::with(&[("0042", "PTH"), ("0042", "LAB")]));

        assert!(resolver.select("PTH").is_err());

        resolver.resolve_prefixes("0042").await.unwrap();
        let err = resolver.select("MIC").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(resolver.selected(), None);
    }

    #[tokio::test]
    async fn test_empty_path_id_rejected() {
        let mut resolver = ReprintResolver::new(FakeDirectory::default());
        let err = resolver.resolve_prefixes("  ").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(*resolver.state(), ReprintState::Idle);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let mut resolver = ReprintResolver::new(FakeDirectory::with(&[("0043", "PTH")]));

        resolver.resolve_prefixes("0043").await.unwrap();
        // Prefix list said PTH but the record store no longer has it
        resolver.directory.issued.clear();
        let err = resolver.resolve_record().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(matches!(
            resolver.state(),
            ReprintState::NotFound { prefix: Some(p), .. } if p == "PTH"
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_selection() {
        let mut directory = FakeDirectory::with(&[("0042", "PTH"), ("0042", "LAB")]);
        directory.offline = true;
        let mut resolver = ReprintResolver::new(directory);

        resolver.resolve_prefixes("0042").await.unwrap();
        resolver.select("LAB").unwrap();
        let err = resolver.resolve_record().await.unwrap_err();
        assert_eq!(err.message, FETCH_FALLBACK);
        assert_eq!(resolver.selected(), Some("LAB"));
    }

    #[tokio::test]
    async fn test_new_lookup_replaces_previous() {
        let mut resolver = ReprintResolver::new(FakeDirectory::with(&[
            ("0042", "PTH"),
            ("0042", "LAB"),
            ("0050", "MIC"),
        ]));

        resolver.resolve_prefixes("0042").await.unwrap();
        resolver.select("LAB").unwrap();
        resolver.resolve_prefixes("0050").await.unwrap();
        assert_eq!(resolver.selected(), Some("MIC"));

        resolver.reset();
        assert_eq!(*resolver.state(), ReprintState::Idle);
    }
}
