/// Tunable behavior of a [`CaseStack`](crate::CaseStack).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaseStackConfig {
    /// Consecutive faults after which an action is evicted during `tick`.
    /// Zero disables eviction (faults are only logged).
    pub fault_limit: u32,
}

impl CaseStackConfig {
    pub const DEFAULT_FAULT_LIMIT: u32 = 3;

    pub fn new() -> Self {
        Self {
            fault_limit: Self::DEFAULT_FAULT_LIMIT,
        }
    }

    pub fn with_fault_limit(fault_limit: u32) -> Self {
        Self { fault_limit }
    }
}

impl Default for CaseStackConfig {
    fn default() -> Self {
        Self::new()
    }
}
