//! Error types for climate diagnostics.

use thiserror::Error;

/// Result type alias using DiagsError.
pub type DiagsResult<T> = Result<T, DiagsError>;

/// Primary error type for diagnostics operations.
#[derive(Debug, Error)]
pub enum DiagsError {
    // === Field Errors ===
    #[error("Cannot convert units from '{from}' to '{to}': {reason}")]
    UnitConversion {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid region '{name}': {message}")]
    InvalidRegion { name: String, message: String },

    #[error("Invalid contour levels: {0}")]
    InvalidLevels(String),

    // === Configuration Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unsupported plotting backend: {0}")]
    UnsupportedBackend(String),

    #[error("Unknown diagnostic set: {0}")]
    UnknownSet(String),

    #[error("Unknown colormap: {0}")]
    UnknownColormap(String),

    #[error("Requested output format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Data / Output Errors ===
    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagsError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        DiagsError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by user configuration rather than data or I/O.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DiagsError::InvalidParameter { .. }
                | DiagsError::UnsupportedBackend(_)
                | DiagsError::UnknownSet(_)
                | DiagsError::UnknownColormap(_)
                | DiagsError::UnsupportedFormat(_)
                | DiagsError::InvalidRegion { .. }
                | DiagsError::InvalidLevels(_)
                | DiagsError::Config(_)
        )
    }
}

impl From<serde_json::Error> for DiagsError {
    fn from(err: serde_json::Error) -> Self {
        DiagsError::Config(format!("JSON error: {}", err))
    }
}
