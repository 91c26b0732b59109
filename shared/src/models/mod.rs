//! Data models shared between the client and the desk

pub mod patient;
pub mod prefix;

pub use patient::{
    AddPatientResponse, ExternalPatient, Gender, IssuanceStamp, MAX_AGE, NewPatient,
    PatientRecord, validate_age,
};
pub use prefix::{PrefixEntry, PrefixStatus, active_prefixes};
