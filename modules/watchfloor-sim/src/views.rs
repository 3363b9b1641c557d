//! Read models returned by the simulation service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::{Domain, FlagType, OperatorStatus, ProtestStatus, RiskLevel};

use crate::books::BookEvent;
use crate::news::{Article, Channel};
use crate::outcomes::OutcomeEntry;
use crate::protest::{Protest, ProtestTransition};
use crate::reluctance::ReluctanceMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveView {
    pub key: String,
    pub week: u32,
    pub title: String,
    pub description: String,
    pub required_domains: Vec<Domain>,
    pub flag_quota: u32,
    pub flags_this_period: u32,
    pub deadline: DateTime<Utc>,
    pub moral_weight: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsView {
    pub awareness: u8,
    pub anger: u8,
    pub awareness_tier: u8,
    pub anger_tier: u8,
    pub awareness_label: String,
    pub anger_label: String,
}

/// A citizen awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub citizen_id: Uuid,
    pub name: String,
    pub neighborhood: String,
    pub matches_directive: bool,
    pub already_flagged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub operator_id: Uuid,
    pub operator_code: String,
    pub status: OperatorStatus,
    pub compliance_score: f64,
    pub directive: DirectiveView,
    pub enabled_domains: Vec<Domain>,
    pub metrics: MetricsView,
    pub reluctance: ReluctanceMetrics,
    pub flags_submitted: u32,
    pub reviews_completed: u32,
    pub hesitation_incidents: u32,
    pub review_queue: Vec<QueueEntry>,
    pub live_protests: Vec<Protest>,
    pub pending_articles: Vec<Article>,
    pub recent_articles: Vec<Article>,
    pub channels: Vec<Channel>,
    pub pending_books: Vec<BookEvent>,
    pub campaign_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagResult {
    pub flag_id: Uuid,
    pub citizen_id: Uuid,
    pub flag_type: FlagType,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub detected: bool,
    pub hesitated: bool,
    pub immediate_outcome: Option<OutcomeEntry>,
    pub operator_status: OperatorStatus,
    pub compliance_score: f64,
    pub directive_key: String,
    pub campaign_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoActionResult {
    pub citizen_id: Uuid,
    pub hesitated: bool,
    pub operator_status: OperatorStatus,
    pub compliance_score: f64,
    pub reluctance: ReluctanceMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeTimeline {
    pub flag_id: Uuid,
    pub citizen_id: Uuid,
    pub citizen_name: String,
    pub flag_type: FlagType,
    pub justification: String,
    pub risk_score: u8,
    pub detected: bool,
    pub submitted_at: DateTime<Utc>,
    pub entries: Vec<OutcomeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorImpactSummary {
    pub operator_id: Uuid,
    pub operator_code: String,
    pub status: OperatorStatus,
    pub compliance_score: f64,
    pub weeks_served: u32,
    pub directives_completed: Vec<String>,
    pub flags_by_type: BTreeMap<FlagType, u32>,
    pub citizens_flagged: u32,
    /// Dependents of everyone flagged.
    pub families_affected: u32,
    pub detections: u32,
    pub no_actions: u32,
    pub hesitation_incidents: u32,
    pub awareness: u8,
    pub anger: u8,
    pub protests_by_status: BTreeMap<ProtestStatus, u32>,
    pub arrests: u32,
    pub casualties: u32,
    pub articles_published: u32,
    pub articles_suppressed: u32,
    pub channels_banned: Vec<String>,
    pub books_banned: Vec<String>,
    pub event_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u32,
    pub articles_published: u32,
    pub articles_drafted: u32,
    pub protest_changes: Vec<ProtestTransition>,
    pub protests_formed: u32,
    pub books_announced: u32,
    pub books_published: u32,
    pub deadline_missed: bool,
    pub operator_status: OperatorStatus,
}
