//! Dispatch layers.

/// Priority slot of a handler under a key.
///
/// Layers always run in declaration order: every `Func` handler runs before any
/// `Overlay` handler, which all run before any `Blocking` handler.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Layer {
    /// Plain handlers.
    #[default]
    Func,
    /// Additive behavior layered over the plain handlers.
    Overlay,
    /// Terminal, high-priority handlers.
    Blocking,
}

impl Layer {
    /// Dispatch order.
    pub const ORDER: [Layer; 3] = [Layer::Func, Layer::Overlay, Layer::Blocking];

    /// Returns true for the layer after which an invocation stops.
    ///
    /// `Blocking` is the last slot today, so stopping after it is the same as
    /// running every layer. Any layer added after it would be skipped.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Layer::Blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn order_matches_declaration() {
        let declared: Vec<Layer> = Layer::iter().collect();
        assert_eq!(declared, Layer::ORDER.to_vec());
    }

    #[test]
    fn only_blocking_is_terminal() {
        assert!(Layer::Blocking.is_terminal());
        assert!(!Layer::Func.is_terminal());
        assert!(!Layer::Overlay.is_terminal());
    }
}
