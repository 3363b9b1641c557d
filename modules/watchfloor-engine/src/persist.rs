//! EventPersister implementations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::stored::StoredEvent;
use crate::traits::EventPersister;

/// In-memory event log. Generates StoredEvents with incrementing sequence
/// numbers. Thread-safe.
#[derive(Debug)]
pub struct MemoryEventSink {
    next_seq: AtomicI64,
    events: Mutex<Vec<StoredEvent>>,
}

impl Default for MemoryEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicI64::new(1),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every persisted event.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events whose type matches `event_type`.
    pub fn of_type(&self, event_type: &str) -> Vec<StoredEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    fn make_stored(
        &self,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
        caused_by_seq: Option<i64>,
    ) -> StoredEvent {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let stored = StoredEvent {
            seq,
            ts: Utc::now(),
            event_type,
            caused_by_seq,
            stream: stream.to_string(),
            payload,
        };
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stored.clone());
        stored
    }
}

#[async_trait]
impl EventPersister for MemoryEventSink {
    async fn persist(
        &self,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent> {
        Ok(self.make_stored(event_type, payload, stream, None))
    }

    async fn persist_child(
        &self,
        parent_seq: i64,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent> {
        Ok(self.make_stored(event_type, payload, stream, Some(parent_seq)))
    }
}

// Arc<P> blanket: lets the owner keep a handle to the sink for reads.
#[async_trait]
impl<P: EventPersister + ?Sized> EventPersister for Arc<P> {
    async fn persist(
        &self,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent> {
        (**self).persist(event_type, payload, stream).await
    }

    async fn persist_child(
        &self,
        parent_seq: i64,
        event_type: String,
        payload: serde_json::Value,
        stream: &str,
    ) -> Result<StoredEvent> {
        (**self)
            .persist_child(parent_seq, event_type, payload, stream)
            .await
    }
}
