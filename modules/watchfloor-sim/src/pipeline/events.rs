//! Session event types for the engine dispatch loop.
//!
//! Every fact about an operator session is one of these. Operator commands
//! enter as root events; everything the world does in response is a child
//! event emitted by the router, so the session log reads as a causal tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::catalog::MetricDeltas;
use watchfloor_common::{Domain, Metric, OperatorStatus};
use watchfloor_engine::EventLike;

use crate::books::BookEvent;
use crate::news::Article;
use crate::outcomes::{CitizenFlag, FlagOutcome};
use crate::protest::{Protest, ProtestTransition};

/// What moved the public metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricSource {
    Action { flag_id: Uuid },
    Article { article_id: Uuid },
    Book { book_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // Session lifecycle
    SessionStarted {
        operator_id: Uuid,
        operator_code: String,
        directive_key: String,
        enabled_domains: Vec<Domain>,
        seed: u64,
        at: DateTime<Utc>,
    },
    SessionEnded {
        operator_id: Uuid,
        at: DateTime<Utc>,
    },
    Ticked {
        at: DateTime<Utc>,
    },

    // Operator decisions
    CitizenAssessed {
        citizen_id: Uuid,
        score: u8,
        at: DateTime<Utc>,
    },
    FlagSubmitted {
        flag: CitizenFlag,
        outcome: FlagOutcome,
        citizen_name: String,
        neighborhood: String,
        dependents: u32,
        hesitated: bool,
    },
    NoActionSubmitted {
        citizen_id: Uuid,
        reason: String,
        hesitated: bool,
        at: DateTime<Utc>,
    },

    // Public metrics
    MetricsShifted {
        source: MetricSource,
        deltas: MetricDeltas,
        at: DateTime<Utc>,
    },
    TierCrossed {
        metric: Metric,
        from: u8,
        to: u8,
        tier_name: String,
        at: DateTime<Utc>,
    },

    // News
    ArticleDrafted {
        article: Article,
    },
    ArticlePublished {
        article_id: Uuid,
        channel_key: String,
        deltas: MetricDeltas,
        at: DateTime<Utc>,
    },
    ArticleSuppressed {
        article_id: Uuid,
        at: DateTime<Utc>,
    },
    ChannelBanned {
        channel_key: String,
        at: DateTime<Utc>,
    },

    // Protests
    ProtestFormed {
        protest: Protest,
    },
    ProtestStatusChanged {
        transition: ProtestTransition,
    },
    IncitingAgentDiscovered {
        protest_id: Uuid,
        at: DateTime<Utc>,
    },

    // Books
    BookAnnounced {
        book: BookEvent,
    },
    BookPublished {
        book_id: Uuid,
        at: DateTime<Utc>,
    },
    BookBanned {
        book_id: Uuid,
        at: DateTime<Utc>,
    },

    // Operator standing
    DeadlineMissed {
        directive_key: String,
        shortfall: u32,
        at: DateTime<Utc>,
    },
    OperatorStatusChanged {
        from: OperatorStatus,
        to: OperatorStatus,
        reason: String,
    },

    // Directive progression
    DirectiveCompleted {
        directive_key: String,
        at: DateTime<Utc>,
    },
    DirectiveAdvanced {
        from: String,
        to: String,
        week: u32,
        at: DateTime<Utc>,
    },
    CampaignCompleted {
        at: DateTime<Utc>,
    },
}

impl SimEvent {
    pub fn variant_name(&self) -> &'static str {
        match self {
            SimEvent::SessionStarted { .. } => "session_started",
            SimEvent::SessionEnded { .. } => "session_ended",
            SimEvent::Ticked { .. } => "ticked",
            SimEvent::CitizenAssessed { .. } => "citizen_assessed",
            SimEvent::FlagSubmitted { .. } => "flag_submitted",
            SimEvent::NoActionSubmitted { .. } => "no_action_submitted",
            SimEvent::MetricsShifted { .. } => "metrics_shifted",
            SimEvent::TierCrossed { .. } => "tier_crossed",
            SimEvent::ArticleDrafted { .. } => "article_drafted",
            SimEvent::ArticlePublished { .. } => "article_published",
            SimEvent::ArticleSuppressed { .. } => "article_suppressed",
            SimEvent::ChannelBanned { .. } => "channel_banned",
            SimEvent::ProtestFormed { .. } => "protest_formed",
            SimEvent::ProtestStatusChanged { .. } => "protest_status_changed",
            SimEvent::IncitingAgentDiscovered { .. } => "inciting_agent_discovered",
            SimEvent::BookAnnounced { .. } => "book_announced",
            SimEvent::BookPublished { .. } => "book_published",
            SimEvent::BookBanned { .. } => "book_banned",
            SimEvent::DeadlineMissed { .. } => "deadline_missed",
            SimEvent::OperatorStatusChanged { .. } => "operator_status_changed",
            SimEvent::DirectiveCompleted { .. } => "directive_completed",
            SimEvent::DirectiveAdvanced { .. } => "directive_advanced",
            SimEvent::CampaignCompleted { .. } => "campaign_completed",
        }
    }
}

impl EventLike for SimEvent {
    fn event_type_str(&self) -> String {
        self.variant_name().to_string()
    }

    fn to_persist_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": self.variant_name(), "serialization_error": e.to_string() })
        })
    }
}
