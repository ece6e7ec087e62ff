//! Deterministic-test hooks: the server clock and the document id source.
//!
//! Server-timestamp sentinels resolve through [`ServerClock`]; `add`-style
//! inserts draw ids from [`IdSource`]. Both default to real-world behavior
//! (wall clock, random ids) and can be pinned by tests through the store
//! builder or setters.

use std::collections::VecDeque;
use std::fmt;

use bson::{DateTime, Uuid};

/// Where server-timestamp sentinels get their value.
pub enum ServerClock {
    /// The current wall-clock time at resolution.
    System,
    /// A fixed instant; every resolution yields the same value.
    Fixed(DateTime),
    /// A value-producing closure, called once per resolution.
    Source(Box<dyn Fn() -> DateTime + Send + Sync>),
}

impl ServerClock {
    /// Resolves one server-timestamp sentinel.
    pub(crate) fn now(&self) -> DateTime {
        match self {
            ServerClock::System => DateTime::from_chrono(chrono::Utc::now()),
            ServerClock::Fixed(at) => *at,
            ServerClock::Source(source) => source(),
        }
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        ServerClock::System
    }
}

impl fmt::Debug for ServerClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerClock::System => write!(f, "ServerClock::System"),
            ServerClock::Fixed(at) => write!(f, "ServerClock::Fixed({at})"),
            ServerClock::Source(_) => write!(f, "ServerClock::Source(..)"),
        }
    }
}

/// Where auto-generated document ids come from.
pub enum IdSource {
    /// Fresh random ids.
    Random,
    /// Ids popped from a queue; falls back to random when drained.
    Queue(VecDeque<String>),
    /// An id-producing closure, called once per insert.
    Source(Box<dyn FnMut() -> String + Send + Sync>),
}

impl IdSource {
    /// Produces the next document id.
    pub(crate) fn next_id(&mut self) -> String {
        match self {
            IdSource::Random => Uuid::new().to_string(),
            IdSource::Queue(queue) => queue
                .pop_front()
                .unwrap_or_else(|| Uuid::new().to_string()),
            IdSource::Source(source) => source(),
        }
    }
}

impl Default for IdSource {
    fn default() -> Self {
        IdSource::Random
    }
}

impl fmt::Debug for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSource::Random => write!(f, "IdSource::Random"),
            IdSource::Queue(queue) => write!(f, "IdSource::Queue({} pending)", queue.len()),
            IdSource::Source(_) => write!(f, "IdSource::Source(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = ServerClock::Fixed(DateTime::from_millis(1_000));
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), DateTime::from_millis(1_000));
    }

    #[test]
    fn queue_source_drains_then_falls_back_to_random() {
        let mut ids = IdSource::Queue(VecDeque::from(["a".to_string(), "b".to_string()]));
        assert_eq!(ids.next_id(), "a");
        assert_eq!(ids.next_id(), "b");
        // Drained queue still produces usable ids.
        assert!(!ids.next_id().is_empty());
    }

    #[test]
    fn closure_source_is_called_per_id() {
        let mut counter = 0u32;
        let mut ids = IdSource::Source(Box::new(move || {
            counter += 1;
            format!("doc-{counter}")
        }));
        assert_eq!(ids.next_id(), "doc-1");
        assert_eq!(ids.next_id(), "doc-2");
    }
}
