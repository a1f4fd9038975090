//! Append-only, per-stream event history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// An event with its position in the stream (1-based, gap-free).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded<E> {
    pub sequence: u64,
    pub event: E,
}

/// Ordered history of one aggregate's events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog<E> {
    entries: Vec<Recorded<E>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Event> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events in order; returns the last assigned sequence number.
    pub fn append(&mut self, events: impl IntoIterator<Item = E>) -> u64 {
        for event in events {
            let sequence = self.version() + 1;
            self.entries.push(Recorded { sequence, event });
        }
        self.version()
    }

    /// Number of events recorded so far.
    pub fn version(&self) -> u64 {
        self.entries.last().map(|r| r.sequence).unwrap_or(0)
    }

    pub fn entries(&self) -> &[Recorded<E>] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.entries.iter().map(|r| &r.event)
    }

    pub fn last_occurred_at(&self) -> Option<DateTime<Utc>> {
        self.entries.last().map(|r| r.event.occurred_at())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
