//! Error types surfaced by the object registry.
//!
//! Public registry operations convert these into `bool`/`Option` results after
//! logging them; they surface directly only through [`Reflect`] member
//! implementations and the `try_*` accessors.
//!
//! [`Reflect`]: crate::Reflect

use thiserror::Error;

use crate::registry::MemberKind;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("object id must not be empty")]
    EmptyId,

    #[error("no object registered under `{0}`")]
    UnknownId(String),

    #[error("object `{id}` is not a `{expected}`")]
    WrongType { id: String, expected: &'static str },

    #[error("member `{member}` of object `{id}` failed")]
    Member {
        id: String,
        member: String,
        #[source]
        source: MemberError,
    },
}

/// Failure resolving or using a named member.
#[derive(Debug, Error)]
pub enum MemberError {
    #[error("`{type_name}` has no member `{member}`")]
    NotFound {
        type_name: &'static str,
        member: String,
    },

    #[error("`{type_name}::{member}` is read-only")]
    NotWritable {
        type_name: &'static str,
        member: String,
    },

    #[error("`{type_name}::{member}` is a {found}, not {expected}")]
    WrongKind {
        type_name: &'static str,
        member: String,
        expected: &'static str,
        found: MemberKind,
    },

    #[error("object is not a `{expected}`")]
    TypeMismatch { expected: &'static str },

    #[error("value does not fit the member")]
    Decode(#[from] serde_json::Error),

    #[error("missing argument at position {0}")]
    MissingArgument(usize),

    #[error("{0}")]
    Failed(String),
}

impl MemberError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<&str> for MemberError {
    fn from(message: &str) -> Self {
        Self::failed(message)
    }
}

impl From<String> for MemberError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}
