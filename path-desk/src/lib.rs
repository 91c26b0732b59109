//! Pathology label desk
//!
//! Patient intake, two-phase reprint lookup and label printing on top of
//! the patient service client and the label printer crate.
//!
//! # Modules
//!
//! - [`core`]: desk configuration
//! - [`intake`]: form validation, autofill and save
//! - [`reprint`]: path id to prefix to record resolution
//! - [`label`]: label assembly shared by intake and reprint
//! - [`printing`]: printer selection and dispatcher construction
//! - [`utils`]: logging

pub mod core;
pub mod intake;
pub mod label;
pub mod printing;
pub mod reprint;
pub mod utils;

// Re-export public types
pub use core::DeskConfig;
pub use intake::{IntakeFlow, IntakeForm, IntakeOutcome, ValidIntake};
pub use label::LabelJob;
pub use printing::{LabelPrinter, dispatcher};
pub use reprint::{ReprintResolver, ReprintState};
pub use utils::logger::{init_logger, init_logger_with_file};
