//! Event dispatch engine.
//!
//! A generic event loop: persist → reduce → route → enqueue children until
//! the queue drains. Every child event records the sequence number of the
//! event that caused it, so a session's log reads as a causal tree.
//!
//! Consumers define their domain by implementing `Reducer` (pure state
//! updates) and `Router` (decisions that emit follow-up events).

pub mod engine;
pub mod persist;
pub mod stored;
pub mod traits;

pub use engine::{Engine, DEFAULT_MAX_EVENTS};
pub use persist::MemoryEventSink;
pub use stored::StoredEvent;
pub use traits::{EventLike, EventPersister, Reducer, Router};
