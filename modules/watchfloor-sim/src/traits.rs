// Collaborator boundaries of the simulation.
//
// CitizenDirectory: read-only source of citizen snapshots (upstream data).
// Clock: wall time, injectable so deadlines and hesitation are testable.
//
// Both have in-memory doubles in `testing`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use watchfloor_common::CitizenSnapshot;

#[async_trait]
pub trait CitizenDirectory: Send + Sync {
    /// Full cross-domain snapshot, or `None` if the citizen is unknown.
    async fn snapshot(&self, citizen_id: Uuid) -> Result<Option<CitizenSnapshot>>;

    /// Every citizen available for review.
    async fn citizens(&self) -> Result<Vec<CitizenSnapshot>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Directory over a fixed list, used by the demo binary.
pub struct StaticDirectory {
    citizens: Vec<CitizenSnapshot>,
}

impl StaticDirectory {
    pub fn new(citizens: Vec<CitizenSnapshot>) -> Self {
        Self { citizens }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl CitizenDirectory for StaticDirectory {
    async fn snapshot(&self, citizen_id: Uuid) -> Result<Option<CitizenSnapshot>> {
        Ok(self
            .citizens
            .iter()
            .find(|c| c.citizen_id == citizen_id)
            .cloned())
    }

    async fn citizens(&self) -> Result<Vec<CitizenSnapshot>> {
        Ok(self.citizens.clone())
    }
}
