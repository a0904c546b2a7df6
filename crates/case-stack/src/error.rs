//! Error types for the case stack.

use thiserror::Error;

use crate::Case;

pub type Result<T> = std::result::Result<T, CaseError>;

/// Rejected arguments. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaseError {
    #[error("raw case value {0} is out of range")]
    OutOfRange(u8),

    #[error("case `{0}` cannot be pushed or bound to actions")]
    Unassignable(Case),
}

/// Failure reported by an action while the stack ticks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
