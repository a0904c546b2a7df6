//! Stacked case manager for gameplay coordination.
//!
//! A [`CaseStack`] keeps an ordered stack of [`Case`] values. Exactly one case,
//! the top of the stack, is active on any tick, and only the actions bound to
//! that case run when the stack is ticked. Cases underneath stay suspended until
//! they surface again.
//!
//! - **Idempotent push**: pushing a present case never reorders or duplicates it
//! - **Non-LIFO pop**: any case can be removed regardless of its position
//! - **Auto-expiry**: a case can be pushed with a lifetime that counts down per tick
//! - **Reentrant**: actions may push, pop and (un)register while the stack ticks
//!
//! # Architecture
//!
//! - [`Case`]: Plain discriminant naming a behavioral context
//! - [`CaseStack`]: Shared handle over the stack state
//! - [`CaseToken`]: Disposable handle removing one action registered by a push
//! - [`CaseStackConfig`]: Fault tolerance knobs for [`CaseStack::tick`]

pub mod case;
pub mod config;
pub mod error;
pub mod stack;
pub mod token;

pub use case::Case;
pub use config::CaseStackConfig;
pub use error::{ActionError, CaseError, Result};
pub use stack::{Action, CaseStack, action};
pub use token::{CaseToken, EntryId};
