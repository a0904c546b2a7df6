//! Playtest client library.
//!
//! Hosts the gameplay objects and the scripted scenario the `playtest` binary
//! runs against the process-wide [`Session`](runtime::Session).
pub mod objects;
pub mod scenario;

pub use objects::{Npc, Rifle};
pub use scenario::{Playtest, PlaytestConfig, PlaytestReport};
