//! Error types for NetCDF reading.

use diags_common::DiagsError;
use thiserror::Error;

/// Result type for NetCDF reader operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Command execution error (for ncdump fallback)
    #[error("Command execution failed: {0}")]
    CommandError(String),
}

impl From<NetCdfError> for DiagsError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::IoError(e) => DiagsError::Io(e),
            other => DiagsError::DataReadError(other.to_string()),
        }
    }
}
