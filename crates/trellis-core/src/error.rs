//! Error catalogue for trellis-core
//!
//! Every fatal or configuration failure the runtime can raise has a fixed code
//! and fixed text here. Call sites add a detail string; they never invent new
//! messages. Codes are documented in `docs/errors.md`.

use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Where the documentation for an error code lives
pub const ERROR_DOCS: &str = "docs/errors.md";

/// Catalogued error conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A hook or render-context operation ran with no node rendering
    OutsideRender,
    /// A component suspended with no enclosing suspense boundary
    SuspendedWithoutBoundary,
    /// A component suspended under a strategy that does not allow it
    SuspenseNotAllowed,
    /// A component returned a genuine error
    ComponentFailed,
    /// No resumable listener is registered under the id
    UnknownListener,
    /// No live actor is registered under the id
    ActorNotRegistered,
    /// An update was requested before any root was rendered
    NoRoot,
    /// Configuration could not be parsed or is out of range
    InvalidConfig,
    /// The host port rejected an outbound message
    HostPort,
}

impl ErrorCode {
    /// Numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::OutsideRender => 1,
            ErrorCode::SuspendedWithoutBoundary => 2,
            ErrorCode::SuspenseNotAllowed => 3,
            ErrorCode::ComponentFailed => 4,
            ErrorCode::UnknownListener => 5,
            ErrorCode::ActorNotRegistered => 6,
            ErrorCode::NoRoot => 7,
            ErrorCode::InvalidConfig => 8,
            ErrorCode::HostPort => 9,
        }
    }

    /// Fixed user-facing text
    pub fn text(&self) -> &'static str {
        match self {
            ErrorCode::OutsideRender => "render context used while no node is rendering",
            ErrorCode::SuspendedWithoutBoundary => {
                "a component suspended but no suspense boundary encloses it"
            }
            ErrorCode::SuspenseNotAllowed => {
                "a component suspended under a strategy that does not support suspension"
            }
            ErrorCode::ComponentFailed => "a component failed while rendering",
            ErrorCode::UnknownListener => "no resumable listener is registered under this id",
            ErrorCode::ActorNotRegistered => "no live actor is registered under this id",
            ErrorCode::NoRoot => "an update was requested before any root was rendered",
            ErrorCode::InvalidConfig => "the runtime configuration is invalid",
            ErrorCode::HostPort => "the host port rejected an outbound message",
        }
    }

    /// Link to the documentation entry for this code
    pub fn doc_link(&self) -> String {
        format!("{}#t{:03}", ERROR_DOCS, self.code())
    }

    /// Whether errors with this code are configuration errors
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ErrorCode::OutsideRender | ErrorCode::InvalidConfig | ErrorCode::NoRoot
        )
    }

    fn format(&self, detail: &str) -> String {
        if detail.is_empty() {
            format!("{}: {} (see {})", self, self.text(), self.doc_link())
        } else {
            format!(
                "{}: {}: {} (see {})",
                self,
                self.text(),
                detail,
                self.doc_link()
            )
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{:03}", self.code())
    }
}

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Aborts the render pass; surfaced to the host's error boundary
    #[error("{}", .code.format(.detail))]
    Fatal { code: ErrorCode, detail: String },

    /// Raised synchronously at the call site
    #[error("{}", .code.format(.detail))]
    Config { code: ErrorCode, detail: String },
}

impl Error {
    /// Raise a catalogued error; the arm follows the code
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if code.is_config() {
            Error::Config { code, detail }
        } else {
            Error::Fatal { code, detail }
        }
    }

    /// The catalogue entry behind this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Fatal { code, .. } | Error::Config { code, .. } => *code,
        }
    }

    /// Whether this error aborts a render pass
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorCode::OutsideRender,
            ErrorCode::SuspendedWithoutBoundary,
            ErrorCode::SuspenseNotAllowed,
            ErrorCode::ComponentFailed,
            ErrorCode::UnknownListener,
            ErrorCode::ActorNotRegistered,
            ErrorCode::NoRoot,
            ErrorCode::InvalidConfig,
            ErrorCode::HostPort,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()));
        }
    }

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorCode::SuspendedWithoutBoundary, "in <Profile>");
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "T002: a component suspended but no suspense boundary encloses it: in <Profile> \
             (see docs/errors.md#t002)"
        );
    }

    #[test]
    fn test_config_arm() {
        let err = Error::new(ErrorCode::OutsideRender, "");
        assert!(!err.is_fatal());
        assert_eq!(err.code(), ErrorCode::OutsideRender);
        assert!(err.to_string().starts_with("T001: "));
    }
}
