//! The case stack.
//!
//! [`CaseStack`] is a cheap-to-clone handle. Actions usually capture a clone so
//! they can push or pop cases from inside [`CaseStack::tick`]. The internal lock
//! is released before any action runs; every iteration works on a snapshot of
//! the action list taken when the iteration starts.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::{ActionError, Case, CaseError, CaseStackConfig, CaseToken, EntryId, Result};

/// Zero-argument action bound to a case.
///
/// Identity is pointer identity: keep a clone of the `Arc` to unregister it
/// with [`CaseStack::unregister_action`].
pub type Action = Arc<dyn Fn() -> std::result::Result<(), ActionError> + Send + Sync>;

/// Wraps a closure into an [`Action`].
pub fn action<F>(f: F) -> Action
where
    F: Fn() -> std::result::Result<(), ActionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

struct ActionEntry {
    id: EntryId,
    action: Action,
    faults: u32,
}

/// Raw stack state. Every mutation goes through the methods below so the
/// membership set always mirrors `order`.
#[derive(Default)]
struct State {
    /// Bottom to top; the last element is the active case.
    order: Vec<Case>,
    members: HashSet<Case>,
    actions: HashMap<Case, Vec<ActionEntry>>,
    timers: HashMap<Case, Duration>,
    next_entry: u64,
}

impl State {
    fn top(&self) -> Option<Case> {
        self.order.last().copied()
    }

    fn insert_case(&mut self, case: Case) -> bool {
        if !self.members.insert(case) {
            return false;
        }
        self.order.push(case);
        true
    }

    fn remove_case(&mut self, case: Case) -> bool {
        if !self.members.remove(&case) {
            return false;
        }
        // Relative order of the remaining cases is preserved.
        self.order.retain(|c| *c != case);
        self.actions.remove(&case);
        self.timers.remove(&case);
        true
    }

    fn add_action(&mut self, case: Case, action: Action) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.actions.entry(case).or_default().push(ActionEntry {
            id,
            action,
            faults: 0,
        });
        id
    }

    fn remove_entry(&mut self, case: Case, id: EntryId) -> bool {
        self.remove_where(case, |entry| entry.id == id)
    }

    fn remove_where(&mut self, case: Case, pred: impl Fn(&ActionEntry) -> bool) -> bool {
        let Some(entries) = self.actions.get_mut(&case) else {
            return false;
        };
        let Some(index) = entries.iter().position(pred) else {
            return false;
        };
        entries.remove(index);
        if entries.is_empty() {
            self.actions.remove(&case);
        }
        true
    }

    fn entry_mut(&mut self, case: Case, id: EntryId) -> Option<&mut ActionEntry> {
        self.actions
            .get_mut(&case)?
            .iter_mut()
            .find(|entry| entry.id == id)
    }

    fn action_count(&self, case: Case) -> usize {
        self.actions.get(&case).map_or(0, Vec::len)
    }

    fn snapshot(&self, case: Case) -> Vec<(EntryId, Action)> {
        self.actions
            .get(&case)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.id, Arc::clone(&entry.action)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Counts every timer down and returns the expired cases, bottom to top.
    fn advance_timers(&mut self, elapsed: Duration) -> Vec<Case> {
        for remaining in self.timers.values_mut() {
            *remaining = remaining.saturating_sub(elapsed);
        }
        self.order
            .iter()
            .copied()
            .filter(|case| self.timers.get(case).is_some_and(Duration::is_zero))
            .collect()
    }
}

pub(crate) struct Shared {
    state: Mutex<State>,
    config: CaseStackConfig,
}

impl Shared {
    /// Token disposal: drop one entry, pop the case if nothing is left on it.
    ///
    /// The entry may already be gone (evicted by `tick` or unregistered); the
    /// case is still popped when it has no actions left.
    pub(crate) fn release(&self, case: Case, entry: EntryId) {
        let mut state = self.state.lock();
        if !state.remove_entry(case, entry) {
            trace!(target: "case_stack", %case, %entry, "token disposed after entry was gone");
        }
        if state.action_count(case) == 0 && state.remove_case(case) {
            debug!(target: "case_stack", %case, %entry, "last action disposed, case popped");
        }
    }
}

/// Stack of cases where only the top case is active.
#[derive(Clone)]
pub struct CaseStack {
    shared: Arc<Shared>,
}

impl CaseStack {
    pub fn new() -> Self {
        Self::with_config(CaseStackConfig::default())
    }

    pub fn with_config(config: CaseStackConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CaseStackConfig {
        &self.shared.config
    }

    /// Pushes `case`, optionally binding an action and arming a lifetime.
    ///
    /// - A case already on the stack keeps its position.
    /// - `action`, when given, is appended to the case's action list and a
    ///   [`CaseToken`] for it is returned.
    /// - A non-zero `duration` (re)arms the countdown; the case is popped by the
    ///   first [`tick`](Self::tick) that runs it out.
    ///
    /// # Errors
    ///
    /// [`CaseError::Unassignable`] for [`Case::None`]; the stack is untouched.
    pub fn push_case(
        &self,
        case: Case,
        action: Option<Action>,
        duration: Option<Duration>,
    ) -> Result<Option<CaseToken>> {
        ensure_assignable(case)?;

        let mut state = self.shared.state.lock();
        if state.insert_case(case) {
            debug!(target: "case_stack", %case, depth = state.order.len(), "case pushed");
        }
        if let Some(duration) = duration.filter(|d| !d.is_zero()) {
            state.timers.insert(case, duration);
        }
        let token = action.map(|action| {
            let entry = state.add_action(case, action);
            CaseToken::new(Arc::downgrade(&self.shared), case, entry)
        });
        Ok(token)
    }

    /// Pushes `case` without an action or lifetime.
    pub fn push(&self, case: Case) -> Result<()> {
        self.push_case(case, None, None).map(|_| ())
    }

    /// Pushes `case` so that it expires after `duration`.
    pub fn push_for(&self, case: Case, duration: Duration) -> Result<()> {
        self.push_case(case, None, Some(duration)).map(|_| ())
    }

    /// Pushes `case` with an action and returns the action's token.
    pub fn push_with(&self, case: Case, action: Action) -> Result<CaseToken> {
        self.push_case(case, Some(action), None)?
            .ok_or(CaseError::Unassignable(case))
    }

    /// Removes `case` wherever it sits, dropping its actions and timer.
    ///
    /// Returns false (and does nothing) if the case is not on the stack.
    pub fn pop_case(&self, case: Case) -> bool {
        if ensure_assignable(case).is_err() {
            return false;
        }
        let removed = self.shared.state.lock().remove_case(case);
        if removed {
            debug!(target: "case_stack", %case, "case popped");
        }
        removed
    }

    /// Advances timers by `elapsed`, then runs the active case's actions.
    ///
    /// Cases whose timer runs out are popped before any action runs, so an
    /// expired case never gets one last execution. An action returning an error
    /// is logged; once it has failed `fault_limit` ticks in a row it is evicted.
    pub fn tick(&self, elapsed: Duration) {
        let (active, snapshot) = {
            let mut state = self.shared.state.lock();
            for case in state.advance_timers(elapsed) {
                state.remove_case(case);
                debug!(target: "case_stack", %case, "case expired");
            }
            let Some(active) = state.top() else {
                return;
            };
            (active, state.snapshot(active))
        };

        for (entry, action) in snapshot {
            match action() {
                Ok(()) => self.record_success(active, entry),
                Err(err) => self.record_fault(active, entry, err),
            }
        }
    }

    fn record_success(&self, case: Case, entry: EntryId) {
        let mut state = self.shared.state.lock();
        if let Some(slot) = state.entry_mut(case, entry) {
            slot.faults = 0;
        }
    }

    fn record_fault(&self, case: Case, entry: EntryId, err: ActionError) {
        let limit = self.shared.config.fault_limit;
        let mut state = self.shared.state.lock();
        let Some(slot) = state.entry_mut(case, entry) else {
            // Removed by another action during this tick.
            warn!(target: "case_stack", %case, %entry, error = %err, "action failed");
            return;
        };
        slot.faults = slot.faults.saturating_add(1);
        let faults = slot.faults;

        if limit > 0 && faults >= limit {
            state.remove_entry(case, entry);
            error!(
                target: "case_stack",
                %case,
                %entry,
                faults,
                error = %err,
                "action kept failing, evicted"
            );
        } else {
            warn!(target: "case_stack", %case, %entry, faults, error = %err, "action failed");
        }
    }

    /// Binds `action` to `case` without changing stack membership.
    ///
    /// The case does not have to be on the stack; the action waits until the
    /// case is pushed and is dropped with it when the case is popped.
    pub fn register_action(&self, case: Case, action: Action) -> Result<()> {
        ensure_assignable(case)?;
        let entry = self.shared.state.lock().add_action(case, action);
        trace!(target: "case_stack", %case, %entry, "action registered");
        Ok(())
    }

    /// Detaches the first registration of `action` from `case`.
    ///
    /// Unlike [`CaseToken::dispose`], the case stays on the stack even when its
    /// last action is removed.
    pub fn unregister_action(&self, case: Case, action: &Action) -> bool {
        self.shared
            .state
            .lock()
            .remove_where(case, |entry| Arc::ptr_eq(&entry.action, action))
    }

    pub fn has_case(&self, case: Case) -> bool {
        self.shared.state.lock().members.contains(&case)
    }

    /// Active case, or [`Case::None`] when the stack is empty.
    pub fn current_case(&self) -> Case {
        self.peek_case().unwrap_or_default()
    }

    /// Active case, if any.
    pub fn peek_case(&self) -> Option<Case> {
        self.shared.state.lock().top()
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().order.is_empty()
    }

    /// Snapshot of the stack, bottom to top.
    pub fn cases(&self) -> Vec<Case> {
        self.shared.state.lock().order.clone()
    }

    /// Number of actions currently bound to `case`.
    pub fn action_count(&self, case: Case) -> usize {
        self.shared.state.lock().action_count(case)
    }

    /// Remaining lifetime of `case`, if it was pushed with one.
    pub fn remaining(&self, case: Case) -> Option<Duration> {
        self.shared.state.lock().timers.get(&case).copied()
    }

    /// Drops every case, action and timer. Outstanding tokens become no-ops.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        let next_entry = state.next_entry;
        *state = State {
            next_entry,
            ..State::default()
        };
        debug!(target: "case_stack", "stack cleared");
    }
}

impl Default for CaseStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CaseStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CaseStack")
            .field("cases", &state.order)
            .field("timers", &state.timers)
            .finish()
    }
}

fn ensure_assignable(case: Case) -> Result<()> {
    if case.is_none() {
        warn!(target: "case_stack", %case, "rejected unassignable case");
        return Err(CaseError::Unassignable(case));
    }
    Ok(())
}
