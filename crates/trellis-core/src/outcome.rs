//! Render outcomes
//!
//! Suspension is ordinary control flow here: a component that needs a pending
//! result returns `Interrupt::Suspend` through `?`, and the reconciler turns
//! the result into a [`RenderOutcome`] it can match on.

use crate::cache::Deferred;
use crate::Element;
use std::fmt;

/// A genuine failure raised by component code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RenderError {}

/// Why a component stopped before producing children
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// Waiting on a pending result
    Suspend(Deferred),
    /// Genuine failure
    Fail(RenderError),
}

impl From<RenderError> for Interrupt {
    fn from(err: RenderError) -> Self {
        Interrupt::Fail(err)
    }
}

/// What a component returns
pub type RenderResult = Result<Vec<Element>, Interrupt>;

/// Result of evaluating a component
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Child descriptions to reconcile
    Value(Vec<Element>),
    /// The component is waiting on this handle
    Suspended(Deferred),
    /// The component failed
    Failed(RenderError),
}

impl From<RenderResult> for RenderOutcome {
    fn from(result: RenderResult) -> Self {
        match result {
            Ok(children) => RenderOutcome::Value(children),
            Err(Interrupt::Suspend(handle)) => RenderOutcome::Suspended(handle),
            Err(Interrupt::Fail(err)) => RenderOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> RenderResult {
        let checked: Result<(), RenderError> = Err(RenderError::new("boom"));
        checked?;
        Ok(Vec::new())
    }

    #[test]
    fn test_question_mark_converts_errors() {
        match RenderOutcome::from(failing()) {
            RenderOutcome::Failed(err) => assert_eq!(err.message(), "boom"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_suspend_outcome() {
        let handle = Deferred::pending();
        let outcome = RenderOutcome::from(Err(Interrupt::Suspend(handle.clone())));
        match outcome {
            RenderOutcome::Suspended(h) => assert_eq!(h.id(), handle.id()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
