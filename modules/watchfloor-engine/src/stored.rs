use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted event with its position in the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: i64,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    /// Seq of the event whose routing emitted this one. `None` for roots.
    pub caused_by_seq: Option<i64>,
    /// Stream the event belongs to (one per session).
    pub stream: String,
    pub payload: serde_json::Value,
}

impl StoredEvent {
    pub fn is_root(&self) -> bool {
        self.caused_by_seq.is_none()
    }
}
