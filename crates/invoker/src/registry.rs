//! The layered invocation registry.
//!
//! # Architecture
//!
//! ```text
//! Invoker
//! └── keys: HashMap<String, Layers>
//!     └── Layers: HashMap<Layer, Vec<Entry>>   (Func → Overlay → Blocking)
//! ```
//!
//! Buckets are created on demand and pruned as soon as they become empty, so a
//! key exists exactly while at least one handler is registered under it.
//!
//! # Reentrancy
//!
//! The internal lock is never held while a handler runs. Each layer is copied
//! into a snapshot before dispatch, so handlers may register, dispose or invoke
//! (including the key currently being dispatched) without disturbing the
//! iteration in progress.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::{EntryId, HandlerError, InvokerConfig, InvokerError, InvokerToken, Layer, Result};

/// Handler receiving the variadic argument list of an invocation.
pub type Handler = Arc<dyn Fn(&[Value]) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Wraps a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&[Value]) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Options attached to a handler at registration time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registration {
    pub layer: Layer,
    /// Human-readable identifier used in logs.
    pub label: Option<String>,
    /// Value matched by [`Invoker::pay`].
    pub metadata: Option<Value>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(layer: Layer) -> Self {
        Self {
            layer,
            ..Self::default()
        }
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// Outcome of one [`Invoker::invoke`] or [`Invoker::pay`] dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvokeReport {
    /// Handler runs that succeeded, including successful retries.
    pub executed: usize,
    /// Retries performed after a failure.
    pub retried: usize,
    /// Handlers removed because their retry failed too.
    pub evicted: usize,
}

impl InvokeReport {
    /// True when no handler had to be evicted.
    pub fn is_clean(&self) -> bool {
        self.evicted == 0
    }
}

struct Entry {
    id: EntryId,
    label: Option<String>,
    metadata: Option<Value>,
    handler: Handler,
}

/// Copy of an entry taken before dispatch.
struct Pending {
    id: EntryId,
    layer: Layer,
    label: Option<String>,
    handler: Handler,
}

type Layers = HashMap<Layer, Vec<Entry>>;

#[derive(Default)]
struct State {
    keys: HashMap<String, Layers>,
    next_entry: u64,
}

impl State {
    fn insert(&mut self, key: &str, registration: Registration, handler: Handler) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.keys
            .entry(key.to_owned())
            .or_default()
            .entry(registration.layer)
            .or_default()
            .push(Entry {
                id,
                label: registration.label,
                metadata: registration.metadata,
                handler,
            });
        id
    }

    fn remove(&mut self, key: &str, layer: Layer, id: EntryId) -> bool {
        let Some(layers) = self.keys.get_mut(key) else {
            return false;
        };
        let Some(entries) = layers.get_mut(&layer) else {
            return false;
        };
        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries.remove(index);
        if entries.is_empty() {
            layers.remove(&layer);
        }
        if layers.is_empty() {
            self.keys.remove(key);
        }
        true
    }

    /// Entries of `layer` under `key`, optionally limited to matching metadata.
    fn snapshot(&self, key: &str, layer: Layer, metadata: Option<&Value>) -> Vec<Pending> {
        let Some(entries) = self.keys.get(key).and_then(|layers| layers.get(&layer)) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|entry| metadata.is_none_or(|wanted| entry.metadata.as_ref() == Some(wanted)))
            .map(|entry| Pending {
                id: entry.id,
                layer,
                label: entry.label.clone(),
                handler: Arc::clone(&entry.handler),
            })
            .collect()
    }

    fn entry_count(&self, key: &str) -> usize {
        self.keys
            .get(key)
            .map_or(0, |layers| layers.values().map(Vec::len).sum())
    }
}

pub(crate) struct Shared {
    state: Mutex<State>,
    config: InvokerConfig,
}

impl Shared {
    pub(crate) fn remove(&self, key: &str, layer: Layer, entry: EntryId) -> bool {
        let removed = self.state.lock().remove(key, layer, entry);
        if removed {
            trace!(target: "invoker", key, %layer, %entry, "handler removed");
        }
        removed
    }
}

/// Keyed registry dispatching to layered handlers.
///
/// Cloning is cheap; clones share the same registrations.
#[derive(Clone)]
pub struct Invoker {
    shared: Arc<Shared>,
}

impl Invoker {
    pub fn new() -> Self {
        Self::with_config(InvokerConfig::default())
    }

    pub fn with_config(config: InvokerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.shared.config
    }

    /// Registers `handler` on the `Func` layer of `key`.
    pub fn register(&self, key: &str, handler: Handler) -> Result<InvokerToken> {
        self.register_with(key, Registration::new(), handler)
    }

    /// Registers `handler` on `layer` of `key`.
    pub fn register_on(&self, key: &str, layer: Layer, handler: Handler) -> Result<InvokerToken> {
        self.register_with(key, Registration::on(layer), handler)
    }

    /// Appends `handler` to the layer chosen by `registration`.
    ///
    /// # Errors
    ///
    /// [`InvokerError::EmptyKey`] if `key` is empty; nothing is registered.
    pub fn register_with(
        &self,
        key: &str,
        registration: Registration,
        handler: Handler,
    ) -> Result<InvokerToken> {
        ensure_key(key)?;
        let layer = registration.layer;
        let entry = self.shared.state.lock().insert(key, registration, handler);
        trace!(target: "invoker", key, %layer, %entry, "handler registered");
        Ok(InvokerToken::new(
            Arc::downgrade(&self.shared),
            key.to_owned(),
            layer,
            entry,
        ))
    }

    /// Runs every handler under `key`, layer by layer.
    ///
    /// Each handler is isolated: a failure is retried once, and a handler whose
    /// retry fails too is evicted. Neither affects the other handlers.
    ///
    /// # Errors
    ///
    /// - [`InvokerError::EmptyKey`] for an empty key
    /// - [`InvokerError::UnknownKey`] if nothing is registered under `key`
    pub fn invoke(&self, key: &str, args: &[Value]) -> Result<InvokeReport> {
        ensure_key(key)?;
        if !self.has_invoker(key) {
            return Err(InvokerError::UnknownKey(key.to_owned()));
        }

        let mut report = InvokeReport::default();
        for layer in Layer::ORDER {
            let pending = self.shared.state.lock().snapshot(key, layer, None);
            for entry in &pending {
                self.dispatch(key, entry, args, &mut report);
            }
            if layer.is_terminal() {
                break;
            }
        }

        debug!(
            target: "invoker",
            key,
            executed = report.executed,
            retried = report.retried,
            evicted = report.evicted,
            "key invoked"
        );
        Ok(report)
    }

    /// Like [`invoke`](Self::invoke) but never surfaces an error.
    ///
    /// Returns true if the invocation ran and no handler had to be evicted.
    pub fn try_invoke(&self, key: &str, args: &[Value]) -> bool {
        match self.invoke(key, args) {
            Ok(report) => report.is_clean(),
            Err(err @ InvokerError::UnknownKey(_)) => {
                debug!(target: "invoker", key, error = %err, "invoke skipped");
                false
            }
            Err(err) => {
                warn!(target: "invoker", key, error = %err, "invoke rejected");
                false
            }
        }
    }

    /// No-op when `key` has no handlers, otherwise [`try_invoke`](Self::try_invoke).
    pub fn invoke_safe(&self, key: &str, args: &[Value]) {
        if self.has_invoker(key) {
            self.try_invoke(key, args);
        }
    }

    /// Runs the handlers whose metadata equals `token` (every handler when
    /// `token` is `None`), across all layers.
    ///
    /// The same retry-then-evict policy applies. Returns true if at least one
    /// handler ran successfully.
    pub fn pay(&self, key: &str, token: Option<&Value>, args: &[Value]) -> bool {
        if let Err(err) = ensure_key(key) {
            warn!(target: "invoker", key, error = %err, "pay rejected");
            return false;
        }

        let pending: Vec<Pending> = {
            let state = self.shared.state.lock();
            Layer::ORDER
                .into_iter()
                .flat_map(|layer| state.snapshot(key, layer, token))
                .collect()
        };
        if pending.is_empty() {
            trace!(target: "invoker", key, token = ?token, "pay matched no handler");
            return false;
        }

        let mut report = InvokeReport::default();
        for entry in &pending {
            self.dispatch(key, entry, args, &mut report);
        }
        debug!(
            target: "invoker",
            key,
            matched = pending.len(),
            executed = report.executed,
            evicted = report.evicted,
            "key paid"
        );
        report.executed > 0
    }

    /// Runs one handler with retry-then-evict. Returns whether it succeeded.
    fn dispatch(
        &self,
        key: &str,
        entry: &Pending,
        args: &[Value],
        report: &mut InvokeReport,
    ) -> bool {
        let max_retries = self.shared.config.max_retries;
        let mut attempt = 0;
        loop {
            let err = match (entry.handler)(args) {
                Ok(()) => {
                    report.executed += 1;
                    return true;
                }
                Err(err) => err,
            };

            if attempt < max_retries {
                attempt += 1;
                report.retried += 1;
                warn!(
                    target: "invoker",
                    key,
                    layer = %entry.layer,
                    entry = %entry.id,
                    label = ?entry.label,
                    attempt,
                    error = %err,
                    "handler failed, retrying"
                );
                continue;
            }

            self.shared.remove(key, entry.layer, entry.id);
            report.evicted += 1;
            error!(
                target: "invoker",
                key,
                layer = %entry.layer,
                entry = %entry.id,
                label = ?entry.label,
                error = %err,
                "handler failed after retry, evicted"
            );
            return false;
        }
    }

    /// O(1) check whether any handler is registered under `key`.
    pub fn has_invoker(&self, key: &str) -> bool {
        self.shared.state.lock().keys.contains_key(key)
    }

    /// Number of handlers under `key` across all layers.
    pub fn entry_count(&self, key: &str) -> usize {
        self.shared.state.lock().entry_count(key)
    }

    /// Keys that currently have handlers, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.state.lock().keys.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Drops every handler under `key`. Outstanding tokens become no-ops.
    pub fn unregister_key(&self, key: &str) -> bool {
        let removed = self.shared.state.lock().keys.remove(key).is_some();
        if removed {
            debug!(target: "invoker", key, "key unregistered");
        }
        removed
    }

    /// Drops every handler. Outstanding tokens become no-ops.
    pub fn clear(&self) {
        self.shared.state.lock().keys.clear();
        debug!(target: "invoker", "invoker cleared");
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("keys", &self.keys())
            .field("config", &self.shared.config)
            .finish()
    }
}

fn ensure_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(InvokerError::EmptyKey);
    }
    Ok(())
}
