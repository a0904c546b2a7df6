//! Session configuration and environment loading.
use std::env;

use case_stack::CaseStackConfig;
use invoker::InvokerConfig;

/// Tunables of a [`Session`](crate::Session).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    pub case_stack: CaseStackConfig,
    pub invoker: InvokerConfig,
}

impl SessionConfig {
    pub fn new(case_stack: CaseStackConfig, invoker: InvokerConfig) -> Self {
        Self {
            case_stack,
            invoker,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CASE_FAULT_LIMIT` - Consecutive tick faults before an action is evicted, 0 disables (default: 3)
    /// - `INVOKER_MAX_RETRIES` - Retries for a failing handler before eviction (default: 1)
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(limit) = read_env::<u32>("CASE_FAULT_LIMIT") {
            config.case_stack.fault_limit = limit;
        }

        if let Some(retries) = read_env::<u32>("INVOKER_MAX_RETRIES") {
            config.invoker.max_retries = retries;
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_component_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.case_stack.fault_limit, CaseStackConfig::DEFAULT_FAULT_LIMIT);
        assert_eq!(config.invoker.max_retries, InvokerConfig::DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn read_env_ignores_missing_and_garbage() {
        assert_eq!(read_env::<u32>("RUNTIME_TEST_SURELY_UNSET_VARIABLE"), None);
        // PATH is set in every test environment and is never a number.
        assert_eq!(read_env::<u32>("PATH"), None);
    }
}
