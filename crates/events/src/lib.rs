//! Domain events.
//!
//! Aggregates in this workspace describe state changes as events; this crate
//! holds the shared contract those events satisfy and the append-only history
//! they are kept in.

pub mod event;
pub mod log;

pub use event::Event;
pub use log::{EventLog, Recorded};
