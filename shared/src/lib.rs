//! Shared types for the pathology label desk
//!
//! Value objects and the error taxonomy used by the printer, client and
//! desk crates:
//!
//! - [`identifier`]: composite label identifiers and decomposition policies
//! - [`models`]: prefix catalog entries, patient records, intake payloads
//! - [`error`]: unified [`AppError`] / [`ErrorCode`]

pub mod error;
pub mod identifier;
pub mod models;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use identifier::{DecomposePolicy, LabelIdentifier};
pub use serde::{Deserialize, Serialize};
