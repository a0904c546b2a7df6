/// Tunable behavior of an [`Invoker`](crate::Invoker).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InvokerConfig {
    /// Extra attempts a failing handler gets within one dispatch before it is
    /// evicted.
    pub max_retries: u32,
}

impl InvokerConfig {
    pub const DEFAULT_MAX_RETRIES: u32 = 1;

    pub fn new() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self::new()
    }
}
