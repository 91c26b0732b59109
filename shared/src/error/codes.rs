//! Unified error codes for the label desk
//!
//! Codes are organized by category:
//! - 0xxx: General errors
//! - 6xxx: Label errors
//! - 7xxx: Print errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed (empty identifier parts, bad form input)
    ValidationFailed = 2,
    /// Resource not found (no prefixes for a path id, no record)
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 6xxx: Label ====================
    /// Barcode payload could not be encoded
    EncodingFailed = 6001,
    /// Label content does not fit the physical format
    LayoutOverflow = 6002,

    // ==================== 7xxx: Print ====================
    /// Print surface anchor (spool directory) is missing
    PrintSurfaceMissing = 7001,
    /// Print operation failed
    PrintFailed = 7002,
    /// Printer is offline or unreachable
    PrinterOffline = 7003,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Collaborator / network failure
    NetworkError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            ErrorCode::EncodingFailed => "Barcode encoding failed",
            ErrorCode::LayoutOverflow => "Label content does not fit the label",

            ErrorCode::PrintSurfaceMissing => "Print surface is not available",
            ErrorCode::PrintFailed => "Print operation failed",
            ErrorCode::PrinterOffline => "Printer is offline",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::NetworkError => "Failed to reach the server. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            6001 => Ok(ErrorCode::EncodingFailed),
            6002 => Ok(ErrorCode::LayoutOverflow),

            7001 => Ok(ErrorCode::PrintSurfaceMissing),
            7002 => Ok(ErrorCode::PrintFailed),
            7003 => Ok(ErrorCode::PrinterOffline),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::NetworkError),

            other => Err(InvalidErrorCode(other)),
        }
    }
}
