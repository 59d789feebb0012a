//! The relay's matchmaking/splicing engine.
//!
//! Three moving parts: an [`onboarding`] task per accepted connection
//! that classifies it as sender or receiver, a single [`table`] actor
//! that owns the `secret -> Transfer` pairing map, and a [`splice`]
//! task per matched pair that forwards sender bytes to the receiver.
//! [`listener`] wires these together into an accept loop.

pub mod listener;
pub mod onboarding;
pub mod secrets;
pub mod splice;
pub mod table;

pub use secrets::{FixedSecrets, RandomSecrets, Secrets};
pub use table::{Command, Conn, TableHandle, spawn_table};
