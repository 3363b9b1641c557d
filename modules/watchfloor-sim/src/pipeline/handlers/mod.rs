//! Session event handlers.
//!
//! Each handler receives an event that has already been reduced, makes
//! the world's decisions (random draws included) and returns child events
//! that re-enter the dispatch loop.

pub(crate) mod clock;
pub(crate) mod decisions;
pub(crate) mod progression;
pub(crate) mod world;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use watchfloor_common::OperatorStatus;
use watchfloor_engine::StoredEvent;

use crate::pipeline::events::SimEvent;
use crate::pipeline::state::{SessionDeps, SessionState};
use crate::news::Story;

/// Dispatch a session event to the appropriate handler.
pub async fn route_session(
    event: &SimEvent,
    _stored: &StoredEvent,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Result<Vec<SimEvent>> {
    match event {
        // Decisions → status changes, public reaction, directive completion
        SimEvent::FlagSubmitted {
            flag,
            outcome,
            neighborhood,
            ..
        } => decisions::handle_flag_submitted(flag, outcome.detected, neighborhood, state, deps),
        SimEvent::NoActionSubmitted { .. } | SimEvent::DeadlineMissed { .. } => {
            Ok(drain_status_changes(state))
        }
        SimEvent::OperatorStatusChanged { from, to, reason } => {
            log_status_change(state, *from, *to, reason);
            Ok(vec![])
        }

        // Public metrics
        SimEvent::MetricsShifted { at, .. } => Ok(world::handle_metrics_shifted(*at, state, deps)),
        SimEvent::TierCrossed {
            metric,
            from,
            to,
            tier_name,
            at,
        } => Ok(world::handle_tier_crossed(*metric, *from, *to, tier_name, *at, state, deps)),

        // News
        SimEvent::ArticleDrafted { article } => {
            debug!(
                article_id = %article.id,
                channel = %article.channel_key,
                headline = %article.headline,
                "article drafted"
            );
            Ok(vec![])
        }
        SimEvent::ArticlePublished {
            article_id,
            deltas,
            at,
            ..
        } => Ok(world::handle_article_published(*article_id, *deltas, *at)),
        SimEvent::ChannelBanned { channel_key, at } => {
            Ok(world::handle_channel_banned(channel_key, *at, state, deps))
        }

        // Protests
        SimEvent::ProtestFormed { protest } => Ok(world::handle_protest_formed(protest, state, deps)),
        SimEvent::ProtestStatusChanged { transition } => {
            Ok(world::handle_protest_changed(transition, state, deps))
        }

        // Books
        SimEvent::BookPublished { book_id, at } => {
            Ok(world::handle_book_resolved(*book_id, false, *at, deps))
        }
        SimEvent::BookBanned { book_id, at } => {
            Ok(world::handle_book_resolved(*book_id, true, *at, deps))
        }

        // Time
        SimEvent::Ticked { at } => Ok(clock::handle_ticked(*at, state, deps)),

        // Directive progression
        SimEvent::DirectiveCompleted { directive_key, at } => {
            progression::handle_directive_completed(directive_key, *at, state, deps)
        }
        SimEvent::DirectiveAdvanced { from, to, week, .. } => {
            info!(operator = %state.operator_code, from = %from, to = %to, week, "directive advanced");
            Ok(vec![])
        }
        SimEvent::CampaignCompleted { .. } => {
            info!(operator = %state.operator_code, weeks = state.week, "campaign completed");
            Ok(vec![])
        }

        // Informational events, no follow-up
        SimEvent::SessionStarted { .. }
        | SimEvent::SessionEnded { .. }
        | SimEvent::CitizenAssessed { .. }
        | SimEvent::ArticleSuppressed { .. }
        | SimEvent::IncitingAgentDiscovered { .. }
        | SimEvent::BookAnnounced { .. } => Ok(vec![]),
    }
}

/// Turn status changes stashed by the reducer into audit events.
pub(crate) fn drain_status_changes(state: &mut SessionState) -> Vec<SimEvent> {
    std::mem::take(&mut state.pending_status_changes)
        .into_iter()
        .map(|c| SimEvent::OperatorStatusChanged {
            from: c.from,
            to: c.to,
            reason: c.reason,
        })
        .collect()
}

/// Draft a story on a random open channel. `None` when no channel is left to carry it.
pub(crate) fn draft_article(
    state: &mut SessionState,
    deps: &SessionDeps,
    story: Story<'_>,
    independent_only: bool,
    at: DateTime<Utc>,
) -> Option<SimEvent> {
    let summary = &deps.catalog.news.headlines.summary;
    state
        .newsroom
        .draft(story, independent_only, summary, state.rng.as_mut(), at)
        .map(|article| SimEvent::ArticleDrafted { article })
}

fn log_status_change(state: &SessionState, from: OperatorStatus, to: OperatorStatus, reason: &str) {
    match to {
        OperatorStatus::Terminated => {
            warn!(operator = %state.operator_code, %from, reason, "operator terminated")
        }
        OperatorStatus::UnderReview => {
            warn!(operator = %state.operator_code, %from, reason, "operator placed under review")
        }
        OperatorStatus::Active => {
            info!(operator = %state.operator_code, %from, reason, "operator cleared")
        }
    }
}
