//! Process-wide bundle of the coordination components.

use std::sync::LazyLock;
use std::time::Duration;

use case_stack::CaseStack;
use invoker::Invoker;
use tracing::{debug, info};

use crate::{ObjectRegistry, SessionConfig};

static GLOBAL: LazyLock<Session> = LazyLock::new(|| Session::new(SessionConfig::from_env()));

/// One case stack plus one object registry (which owns the invoker).
///
/// Gameplay code normally goes through [`Session::global`]; tests build
/// isolated sessions with [`Session::new`].
#[derive(Debug)]
pub struct Session {
    cases: CaseStack,
    registry: ObjectRegistry,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let cases = CaseStack::with_config(config.case_stack.clone());
        let registry = ObjectRegistry::with_invoker(Invoker::with_config(config.invoker.clone()));
        debug!(
            target: "runtime::session",
            fault_limit = config.case_stack.fault_limit,
            max_retries = config.invoker.max_retries,
            "session created"
        );
        Self {
            cases,
            registry,
            config,
        }
    }

    /// The process-wide session, created on first use from the environment.
    pub fn global() -> &'static Session {
        &GLOBAL
    }

    pub fn cases(&self) -> &CaseStack {
        &self.cases
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn invoker(&self) -> &Invoker {
        self.registry.invoker()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Advances one frame of the case stack.
    pub fn tick(&self, elapsed: Duration) {
        self.cases.tick(elapsed);
    }

    /// Clears every case, action, object, cached accessor and invoker key.
    ///
    /// Outstanding tokens stay valid and become no-ops.
    pub fn teardown(&self) {
        let cases = self.cases.len();
        let objects = self.registry.len();
        self.cases.clear();
        self.registry.clear();
        info!(target: "runtime::session", cases, objects, "session torn down");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_stack::{Case, CaseStackConfig, action};
    use invoker::{InvokerConfig, handler};
    use std::sync::Arc;

    struct Marker;

    impl crate::Reflect for Marker {
        fn members() -> crate::MemberTable<Self> {
            crate::MemberTable::new()
        }
    }

    #[test]
    fn new_applies_config() {
        let config = SessionConfig::new(
            CaseStackConfig::with_fault_limit(0),
            InvokerConfig::with_max_retries(2),
        );
        let session = Session::new(config.clone());

        assert_eq!(session.config(), &config);
        assert_eq!(session.cases().config().fault_limit, 0);
        assert_eq!(session.invoker().config().max_retries, 2);
    }

    #[test]
    fn invoker_is_shared_with_registry() {
        let session = Session::default();
        let _token = session.invoker().register("k", handler(|_| Ok(()))).unwrap();
        assert!(session.registry().has_invoker("k"));
    }

    #[test]
    fn teardown_clears_everything() {
        let session = Session::default();
        session
            .cases()
            .register_action(Case::Combat, action(|| Ok(())))
            .unwrap();
        session.cases().push(Case::Combat).unwrap();
        session.registry().register_id("crate", Arc::new(Marker));
        let _token = session.invoker().register("k", handler(|_| Ok(()))).unwrap();

        session.teardown();

        assert!(session.cases().is_empty());
        assert_eq!(session.cases().action_count(Case::Combat), 0);
        assert!(session.registry().is_empty());
        assert!(!session.invoker().has_invoker("k"));
    }

    #[test]
    fn global_is_a_single_instance() {
        assert!(std::ptr::eq(Session::global(), Session::global()));
    }
}
