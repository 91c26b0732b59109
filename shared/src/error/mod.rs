//! Unified error system for the label desk
//!
//! - [`ErrorCode`]: standardized error codes
//! - [`ErrorCategory`]: classification of codes by range
//! - [`AppError`]: operator-facing error with code, message and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors (validation, not found)
//! - 6xxx: Label errors (encoding, layout)
//! - 7xxx: Print errors (surface, printer)
//! - 9xxx: System errors (network, internal)
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::validation("Age must be between 0 and 99")
//!     .with_detail("field", "age");
//! assert_eq!(err.code, ErrorCode::ValidationFailed);
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
