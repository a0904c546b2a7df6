//! Keyed, layered invocation registry.
//!
//! Producers and consumers communicate through string keys without holding
//! references to each other. Each key owns three ordered [`Layer`]s; invoking a
//! key runs `Func` handlers, then `Overlay`, then `Blocking`.
//!
//! Handlers return `Result`. A failing handler is retried once; if the retry
//! fails too, the handler is evicted so it is never invoked again. The outcome
//! of every invocation is reported in an [`InvokeReport`].
//!
//! Modules are organized by responsibility:
//! - [`layer`] defines dispatch priorities
//! - [`registry`] hosts [`Invoker`] and its registration options
//! - [`token`] provides the disposable [`InvokerToken`]
//! - [`args`] helps handlers decode their argument list

pub mod args;
pub mod config;
pub mod error;
pub mod layer;
pub mod registry;
pub mod token;

pub use args::arg;
pub use config::InvokerConfig;
pub use error::{HandlerError, InvokerError, Result};
pub use layer::Layer;
pub use registry::{Handler, InvokeReport, Invoker, Registration, handler};
pub use token::{EntryId, InvokerToken};

/// Dynamic argument and metadata value.
pub use serde_json::Value;
