//! Runtime coordination layer for gameplay systems.
//!
//! This crate puts the [`ObjectRegistry`] on top of the keyed [`Invoker`] and
//! bundles it with a [`CaseStack`] into a [`Session`]. Systems locate each
//! other by string id, reach into each other's declared members by name, and
//! publish keyed events without holding direct references.
//!
//! Modules are organized by responsibility:
//! - [`registry`] hosts the object registry and the [`Reflect`] capability tables
//! - [`session`] bundles the components and owns the process-wide instance
//! - [`config`] loads tunables from the environment
//! - [`error`] defines the registry and member failures
//!
//! [`Invoker`]: invoker::Invoker
//! [`CaseStack`]: case_stack::CaseStack
pub mod config;
pub mod error;
pub mod registry;
pub mod session;

pub use config::SessionConfig;
pub use error::{MemberError, RegistryError, Result};
pub use registry::{MemberKind, MemberTable, Object, ObjectRegistry, Reflect, param};
pub use session::Session;
