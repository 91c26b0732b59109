//! Patient record model
//!
//! Wire names follow the patient service (`pathId`, `uhid`, `barcode`), the
//! Rust side uses the label vocabulary (`local_id`, `external_health_id`,
//! `composite_barcode`).

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};
use crate::identifier::{DecomposePolicy, LabelIdentifier};

/// Oldest age accepted at intake
pub const MAX_AGE: u8 = 99;

/// Patient gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Map a single-letter code from the hospital information system.
    ///
    /// Unknown codes fall back to `Other`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Gender::Male,
            "F" => Gender::Female,
            _ => Gender::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(AppError::validation(format!("Unknown gender: {other}"))
                .with_detail("field", "gender")),
        }
    }
}

/// Check an age against the accepted range
pub fn validate_age(age: i64) -> AppResult<u8> {
    if (0..=MAX_AGE as i64).contains(&age) {
        Ok(age as u8)
    } else {
        Err(
            AppError::validation(format!("Age must be between 0 and {MAX_AGE}, got {age}"))
                .with_detail("field", "age"),
        )
    }
}

/// Ages arrive as numbers or as strings (form values); accept both.
///
/// Stored and external ages are read as given. The intake range applies
/// only when a new record is issued.
fn de_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Date and time a label was issued, in the service's string formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceStamp {
    /// `YYYY-MM-DD`
    pub date: String,
    /// 12-hour clock with AM/PM suffix, e.g. `3:07:09 PM`
    pub time: String,
}

impl IssuanceStamp {
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        let (is_pm, hour) = at.hour12();
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            time: format!(
                "{}:{:02}:{:02} {}",
                hour,
                at.minute(),
                at.second(),
                if is_pm { "PM" } else { "AM" }
            ),
        }
    }

    /// Stamp from the local wall clock
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local())
    }
}

/// A persisted patient record, as returned by the patient service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub prefix: String,
    #[serde(rename = "pathId")]
    pub local_id: String,
    #[serde(rename = "uhid", default)]
    pub external_health_id: String,
    pub patient_name: String,
    #[serde(deserialize_with = "de_age")]
    pub age: u32,
    pub gender: Gender,
    #[serde(rename = "barcode")]
    pub composite_barcode: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PatientRecord {
    /// Label identity of this record.
    ///
    /// The path id is recovered from the stored composite barcode under the
    /// given policy, the same way the label text is derived at print time.
    pub fn identifier(&self, policy: DecomposePolicy) -> AppResult<LabelIdentifier> {
        LabelIdentifier::from_composite(&self.composite_barcode, &self.prefix, policy)
    }
}

/// `POST /api/patients/add-patient` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub prefix: String,
    #[serde(rename = "pathId")]
    pub local_id: String,
    #[serde(rename = "uhid")]
    pub external_health_id: String,
    pub patient_name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(rename = "barcode")]
    pub composite_barcode: String,
    pub date: String,
    pub time: String,
    pub user_id: Option<String>,
}

impl NewPatient {
    /// Assemble the payload for an identifier issued at `stamp`
    pub fn issue(
        identifier: &LabelIdentifier,
        external_health_id: impl Into<String>,
        patient_name: impl Into<String>,
        age: u8,
        gender: Gender,
        stamp: IssuanceStamp,
        user_id: Option<String>,
    ) -> Self {
        Self {
            prefix: identifier.prefix.clone(),
            local_id: identifier.local_id.clone(),
            external_health_id: external_health_id.into(),
            patient_name: patient_name.into(),
            age,
            gender,
            composite_barcode: identifier.composite(),
            date: stamp.date,
            time: stamp.time,
            user_id,
        }
    }

    /// The record this payload will be stored as
    pub fn into_record(self) -> PatientRecord {
        PatientRecord {
            id: None,
            prefix: self.prefix,
            local_id: self.local_id,
            external_health_id: self.external_health_id,
            patient_name: self.patient_name,
            age: self.age.into(),
            gender: self.gender,
            composite_barcode: self.composite_barcode,
            date: self.date,
            time: self.time,
            user_id: self.user_id,
        }
    }
}

/// Response body of a successful save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPatientResponse {
    pub message: String,
}

/// Demographics from the hospital information system, used for autofill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPatient {
    pub name: String,
    #[serde(deserialize_with = "de_age")]
    pub age: u32,
    pub gender_code: String,
}

impl ExternalPatient {
    pub fn gender(&self) -> Gender {
        Gender::from_code(&self.gender_code)
    }
}
