//! Core traits for the event engine.

use anyhow::Result;
use async_trait::async_trait;

use crate::stored::StoredEvent;

/// Events carry a type string and know how to serialize for the log.
pub trait EventLike: Clone + Send + Sync + 'static {
    /// Stable type string, e.g. `"flag_submitted"`.
    fn event_type_str(&self) -> String;

    fn to_persist_payload(&self) -> serde_json::Value;
}

/// Pure state updates. No I/O, no randomness.
///
/// Called for every event before routing.
pub trait Reducer<E: EventLike, S: Send>: Send + Sync {
    fn reduce(&self, state: &mut S, event: &E);
}

/// Decides what happens next. Returns zero or more child events that
/// re-enter the dispatch loop.
///
/// Gets `&mut S` so it can drain values the reducer stashed and draw from
/// state-owned sources; it must not apply facts itself.
#[async_trait]
pub trait Router<E: EventLike, S: Send, D: Send + Sync>: Send + Sync {
    async fn route(
        &self,
        event: &E,
        stored: &StoredEvent,
        state: &mut S,
        deps: &D,
    ) -> Result<Vec<E>>;
}

/// Persists events and returns a StoredEvent with its sequence number.
#[async_trait]
pub trait EventPersister: Send + Sync {
    /// Persist a root event (no cause).
    async fn persist(
        &self,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent>;

    /// Persist a child event caused by `parent_seq`.
    async fn persist_child(
        &self,
        parent_seq: i64,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent>;
}
