//! Error types for the printer library

use std::path::PathBuf;

use thiserror::Error;

use crate::code128::EncodeError;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Barcode payload could not be encoded
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodeError),

    /// Content does not fit on the label
    #[error("Label overflow: content needs {needed_mm:.2}mm, label has {available_mm:.2}mm")]
    LayoutOverflow { needed_mm: f32, available_mm: f32 },

    /// The directory print surfaces are anchored in does not exist
    #[error("Print surface anchor missing: {}", .0.display())]
    SurfaceAnchorMissing(PathBuf),

    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Printer is offline or unreachable
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Platform print command exited unsuccessfully
    #[error("Print command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

impl From<PrintError> for shared::AppError {
    fn from(err: PrintError) -> Self {
        use shared::ErrorCode;

        let code = match &err {
            PrintError::Encoding(_) => ErrorCode::EncodingFailed,
            PrintError::LayoutOverflow { .. } => ErrorCode::LayoutOverflow,
            PrintError::SurfaceAnchorMissing(_) => ErrorCode::PrintSurfaceMissing,
            PrintError::Offline(_) | PrintError::Connection(_) | PrintError::Timeout(_) => {
                ErrorCode::PrinterOffline
            }
            PrintError::InvalidConfig(_) => ErrorCode::InvalidRequest,
            PrintError::Io(_) | PrintError::CommandFailed { .. } => ErrorCode::PrintFailed,
        };
        shared::AppError::with_message(code, err.to_string())
    }
}
