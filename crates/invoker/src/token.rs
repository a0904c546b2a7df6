//! Disposable registration handles.

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Layer;
use crate::registry::Shared;

/// Identifies one handler entry inside an [`Invoker`](crate::Invoker).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl EntryId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Removes exactly one registered handler when disposed.
///
/// Empty layer and key buckets are pruned, so [`Invoker::has_invoker`] turns
/// false once the last handler of a key is disposed. Disposal is idempotent.
///
/// [`Invoker::has_invoker`]: crate::Invoker::has_invoker
#[must_use = "dropping an InvokerToken keeps the handler registered; call `dispose` to remove it"]
pub struct InvokerToken {
    invoker: Weak<Shared>,
    key: String,
    layer: Layer,
    entry: EntryId,
    disposed: AtomicBool,
}

impl InvokerToken {
    pub(crate) fn new(invoker: Weak<Shared>, key: String, layer: Layer, entry: EntryId) -> Self {
        Self {
            invoker,
            key,
            layer,
            entry,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.invoker.upgrade() {
            shared.remove(&self.key, self.layer, self.entry);
        }
    }
}

impl fmt::Debug for InvokerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokerToken")
            .field("key", &self.key)
            .field("layer", &self.layer)
            .field("entry", &self.entry)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
