//! Error types surfaced by the invoker.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InvokerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokerError {
    #[error("invocation key must not be empty")]
    EmptyKey,

    #[error("no handlers registered under `{0}`")]
    UnknownKey(String),
}

/// Failure reported by a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("missing argument at position {0}")]
    MissingArgument(usize),

    #[error("argument at position {index} has the wrong shape")]
    BadArgument {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::failed(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}
