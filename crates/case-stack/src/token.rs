//! Disposable registration handles.

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Case;
use crate::stack::Shared;

/// Identifies one action entry inside a [`CaseStack`](crate::CaseStack).
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

/// Handle returned by [`CaseStack::push_case`](crate::CaseStack::push_case) for
/// the action that was pushed alongside the case.
///
/// Disposing the token removes exactly that action. If it was the last action
/// bound to the case, the case is popped as well. Disposal is idempotent and
/// becomes a no-op once the stack itself has been dropped.
///
/// Dropping a token without disposing it leaves the action registered.
#[must_use = "dropping a CaseToken keeps the action registered; call `dispose` to remove it"]
pub struct CaseToken {
    stack: Weak<Shared>,
    case: Case,
    entry: EntryId,
    disposed: AtomicBool,
}

impl CaseToken {
    pub(crate) fn new(stack: Weak<Shared>, case: Case, entry: EntryId) -> Self {
        Self {
            stack,
            case,
            entry,
            disposed: AtomicBool::new(false),
        }
    }

    /// Case the action is bound to.
    pub fn case(&self) -> Case {
        self.case
    }

    /// Entry removed by [`dispose`](Self::dispose).
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Removes the action and pops its case when no action is left on it.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.stack.upgrade() {
            shared.release(self.case, self.entry);
        }
    }
}

impl fmt::Debug for CaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseToken")
            .field("case", &self.case)
            .field("entry", &self.entry)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
