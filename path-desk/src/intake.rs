//! Patient intake
//!
//! Validates the operator's form against the prefix catalog, optionally
//! autofills demographics from the external health-record system, saves the
//! record and hands back the label for preview and printing.

use path_client::{PatientRegistry, SAVE_FALLBACK};
use path_printer::LabelFormat;
use shared::models::{
    ExternalPatient, Gender, IssuanceStamp, NewPatient, PrefixEntry, active_prefixes, validate_age,
};
use shared::{AppError, AppResult, LabelIdentifier};
use tracing::{info, instrument, warn};

use crate::label::LabelJob;

/// Raw intake form, as entered by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub prefix: String,
    pub path_id: String,
    pub uhid: String,
    pub patient_name: String,
    pub age: String,
    pub gender: String,
}

/// A form that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidIntake {
    pub identifier: LabelIdentifier,
    pub external_health_id: String,
    pub patient_name: String,
    pub age: u8,
    pub gender: Gender,
}

impl IntakeForm {
    /// Check the form against the active prefixes of `catalog`
    pub fn validate(&self, catalog: &[PrefixEntry]) -> AppResult<ValidIntake> {
        let prefix = self.prefix.trim();
        if prefix.is_empty() {
            return Err(
                AppError::validation("Please select a prefix").with_detail("field", "prefix")
            );
        }
        if !active_prefixes(catalog).iter().any(|p| p.prefix == prefix) {
            return Err(AppError::validation(format!("Prefix {prefix} is not active"))
                .with_detail("field", "prefix"));
        }

        let identifier = LabelIdentifier::new(prefix, self.path_id.trim())?;

        let patient_name = self.patient_name.trim();
        if patient_name.is_empty() {
            return Err(
                AppError::validation("Patient name must not be empty")
                    .with_detail("field", "patientName"),
            );
        }

        let age: i64 = self.age.trim().parse().map_err(|_| {
            AppError::validation(format!("Age must be a number, got '{}'", self.age.trim()))
                .with_detail("field", "age")
        })?;
        let age = validate_age(age)?;

        let gender = self.gender.parse::<Gender>()?;

        Ok(ValidIntake {
            identifier,
            external_health_id: self.uhid.trim().to_string(),
            patient_name: patient_name.to_string(),
            age,
            gender,
        })
    }

    /// Copy autofilled demographics into the form
    pub fn apply_external(&mut self, external: &ExternalPatient) {
        self.patient_name = external.name.clone();
        self.age = external.age.to_string();
        self.gender = external.gender().to_string();
    }
}

/// Result of a successful intake
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    /// Confirmation from the patient service
    pub message: String,
    pub patient: NewPatient,
    pub label: LabelJob,
}

/// Intake against a patient registry
pub struct IntakeFlow<'a, R: PatientRegistry> {
    registry: &'a R,
    org: String,
    format: LabelFormat,
    user_id: Option<String>,
}

impl<'a, R: PatientRegistry> IntakeFlow<'a, R> {
    pub fn new(registry: &'a R, org: impl Into<String>, format: LabelFormat) -> Self {
        Self {
            registry,
            org: org.into(),
            format,
            user_id: None,
        }
    }

    /// Issuing user recorded with each saved patient
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Prefixes the operator may pick from
    pub async fn selectable_prefixes(&self) -> AppResult<Vec<PrefixEntry>> {
        let catalog = self
            .registry
            .catalog()
            .await
            .map_err(|e| e.into_app_error("Failed to load prefixes. Please try again."))?;
        Ok(active_prefixes(&catalog).into_iter().cloned().collect())
    }

    /// Fill name, age and gender from the external record for the form's
    /// UHID. Returns whether anything was filled; failures are only logged.
    #[instrument(skip(self, form), fields(uhid = %form.uhid))]
    pub async fn autofill(&self, form: &mut IntakeForm) -> bool {
        let uhid = form.uhid.trim();
        if uhid.is_empty() {
            return false;
        }
        match self.registry.external(uhid).await {
            Ok(external) => {
                form.apply_external(&external);
                info!("Demographics autofilled");
                true
            }
            Err(e) => {
                warn!(error = %e, "Autofill failed, form left unchanged");
                false
            }
        }
    }

    /// Validate, save and build the label, stamped with the current time
    pub async fn submit(&self, form: &IntakeForm) -> AppResult<IntakeOutcome> {
        self.submit_at(form, IssuanceStamp::now()).await
    }

    /// Validate, save and build the label with an explicit issuance stamp
    #[instrument(skip(self, form, stamp), fields(prefix = %form.prefix, path_id = %form.path_id))]
    pub async fn submit_at(
        &self,
        form: &IntakeForm,
        stamp: IssuanceStamp,
    ) -> AppResult<IntakeOutcome> {
        let catalog = self
            .registry
            .catalog()
            .await
            .map_err(|e| e.into_app_error("Failed to load prefixes. Please try again."))?;
        let valid = form.validate(&catalog)?;

        // Label first: an unprintable id must not be saved
        let label = LabelJob::new(&self.org, &valid.identifier, self.format)?;

        let patient = NewPatient::issue(
            &valid.identifier,
            valid.external_health_id,
            valid.patient_name,
            valid.age,
            valid.gender,
            stamp,
            self.user_id.clone(),
        );

        let response = self
            .registry
            .save(&patient)
            .await
            .map_err(|e| e.into_app_error(SAVE_FALLBACK))?;

        info!(barcode = %patient.composite_barcode, "Patient saved");

        Ok(IntakeOutcome {
            message: response.message,
            patient,
            label,
        })
    }
}
