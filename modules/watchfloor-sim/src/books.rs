//! Rare book-publication controversies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::catalog::BookConfig;
use watchfloor_common::{BookStatus, SimError, SimResult};

use crate::random::RandomSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEvent {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub announced_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl BookEvent {
    pub fn is_pending(&self) -> bool {
        self.status == BookStatus::Pending
    }

    pub fn check_bannable(&self) -> SimResult<()> {
        match self.status {
            BookStatus::Pending => Ok(()),
            BookStatus::Published => Err(SimError::Conflict(format!(
                "book '{}' already published",
                self.title
            ))),
            BookStatus::Banned => Err(SimError::Conflict(format!(
                "book '{}' already banned",
                self.title
            ))),
        }
    }

    /// Pending → `to`; a resolved book never changes again.
    pub fn resolve(&mut self, to: BookStatus, at: DateTime<Utc>) {
        if self.is_pending() && to != BookStatus::Pending {
            self.status = to;
            self.resolved_at = Some(at);
        }
    }
}

/// Roll for a new controversy. Needs enough awareness, no book already
/// pending, and a title that has not been used yet.
pub fn roll_announcement(
    cfg: &BookConfig,
    awareness_tier: u8,
    existing: &[BookEvent],
    rng: &mut dyn RandomSource,
    now: DateTime<Utc>,
) -> Option<BookEvent> {
    if awareness_tier < cfg.min_awareness_tier || existing.iter().any(BookEvent::is_pending) {
        return None;
    }
    let unused: Vec<_> = cfg
        .titles
        .iter()
        .filter(|t| !existing.iter().any(|b| b.title == t.title))
        .collect();
    if unused.is_empty() || !rng.chance(cfg.chance_per_tick) {
        return None;
    }
    let title = unused[rng.pick(unused.len())?];
    Some(BookEvent {
        id: Uuid::new_v4(),
        title: title.title.clone(),
        author: title.author.clone(),
        status: BookStatus::Pending,
        announced_at: now,
        resolved_at: None,
    })
}
