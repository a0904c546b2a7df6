//! Case discriminants.

use tracing::warn;

use crate::CaseError;

/// Behavioral context that can occupy the active slot of a [`CaseStack`].
///
/// Cases are plain values; nothing is allocated when a case is pushed.
/// [`Case::None`] is what an empty stack reports and can never be pushed.
///
/// [`CaseStack`]: crate::CaseStack
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
    strum::AsRefStr,
    strum::EnumIter,
    strum::EnumCount,
    strum::FromRepr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u8)]
pub enum Case {
    /// No case; reported by an empty stack.
    #[default]
    None = 0,
    /// Weapon raised, camera zoomed.
    Aim,
    /// Trigger held.
    Fire,
    /// Weapon reload in progress.
    Reload,
    /// Combat stance (player or NPC).
    Combat,
    /// Conversation with an NPC.
    Dialogue,
    /// A menu or overlay owns input.
    Ui,
    /// All gameplay input locked.
    Locked,
    /// Scripted sequence.
    Cutscene,
    /// Save restore in progress.
    Restore,
}

impl Case {
    /// Converts a raw discriminant, rejecting values outside the enum.
    pub fn from_raw(raw: u8) -> Result<Self, CaseError> {
        Self::from_repr(raw).ok_or_else(|| {
            warn!(target: "case_stack", raw, "rejected out-of-range case value");
            CaseError::OutOfRange(raw)
        })
    }

    /// Returns the raw discriminant.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Returns true for [`Case::None`].
    #[inline]
    pub const fn is_none(self) -> bool {
        matches!(self, Case::None)
    }

    /// Returns true if this case blocks gated gameplay input while active.
    ///
    /// The stack itself never consults this; consumers such as input handlers
    /// check `stack.current_case().is_blocking()` before acting.
    pub const fn is_blocking(self) -> bool {
        matches!(
            self,
            Case::Dialogue | Case::Ui | Case::Locked | Case::Cutscene | Case::Restore
        )
    }
}

impl TryFrom<u8> for Case {
    type Error = CaseError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}
