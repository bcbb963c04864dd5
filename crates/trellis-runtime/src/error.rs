//! Error types for trellis-runtime

use thiserror::Error;
use trellis_core::ErrorCode;

/// Result type for trellis-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trellis-runtime
#[derive(Debug, Error)]
pub enum Error {
    /// Catalogued render or configuration error
    #[error(transparent)]
    Core(#[from] trellis_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a catalogued error
    pub fn catalogued(code: ErrorCode, detail: impl Into<String>) -> Self {
        Error::Core(trellis_core::Error::new(code, detail))
    }

    /// Catalogue code, if this error came from the catalogue
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Core(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Whether this error aborted a render pass
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Core(err) if err.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogued_code_survives_wrapping() {
        let err = Error::catalogued(ErrorCode::UnknownListener, "0:onClick");
        assert_eq!(err.code(), Some(ErrorCode::UnknownListener));
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("T005"));
    }

    #[test]
    fn test_config_errors_are_not_fatal() {
        let err = Error::catalogued(ErrorCode::InvalidConfig, "time_slice_ms must be positive");
        assert!(!err.is_fatal());

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), None);
    }
}
