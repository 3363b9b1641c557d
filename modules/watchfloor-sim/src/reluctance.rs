//! Operator reluctance against the current directive period.
//!
//! The tracker owns the operator's status. Violations (an upward crossing of
//! the warning threshold, or a missed deadline) move ACTIVE to UNDER_REVIEW;
//! a violation while under review terminates. Meeting the quota while under
//! review clears the operator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use watchfloor_common::catalog::{DirectiveConfig, ReluctanceConfig};
use watchfloor_common::OperatorStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ReluctanceVerdict {
    None,
    Warned { reason: String },
    Terminated { reason: String },
    Cleared,
}

impl ReluctanceVerdict {
    /// Status the operator moves to, if the verdict changes it.
    pub fn next_status(&self) -> Option<OperatorStatus> {
        match self {
            ReluctanceVerdict::None => None,
            ReluctanceVerdict::Warned { .. } => Some(OperatorStatus::UnderReview),
            ReluctanceVerdict::Terminated { .. } => Some(OperatorStatus::Terminated),
            ReluctanceVerdict::Cleared => Some(OperatorStatus::Active),
        }
    }
}

/// Read-only view for dashboards and summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReluctanceMetrics {
    pub reluctance_score: f64,
    pub no_action_count: u32,
    pub hesitation_count: u32,
    pub actions_taken: u32,
    pub actions_required: u32,
    pub quota_shortfall: u32,
    pub warnings: u32,
    pub under_review: bool,
    pub missed_deadlines: u32,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReluctanceTracker {
    status: OperatorStatus,
    directive_key: String,
    required: u32,
    period: Duration,
    deadline: DateTime<Utc>,

    // Current period
    actions_taken: u32,
    no_actions: u32,
    delays: u32,
    deadline_missed: bool,
    score: f64,

    // Whole session
    warnings: u32,
    total_no_actions: u32,
    total_hesitations: u32,
    missed_deadlines: u32,
}

impl ReluctanceTracker {
    pub fn new(directive: &DirectiveConfig, now: DateTime<Utc>) -> Self {
        let period = Duration::hours(i64::from(directive.time_limit_hours));
        Self {
            status: OperatorStatus::Active,
            directive_key: directive.key.clone(),
            required: directive.flag_quota,
            period,
            deadline: now + period,
            actions_taken: 0,
            no_actions: 0,
            delays: 0,
            deadline_missed: false,
            score: 0.0,
            warnings: 0,
            total_no_actions: 0,
            total_hesitations: 0,
            missed_deadlines: 0,
        }
    }

    /// Start a fresh period for a newly assigned directive.
    pub fn begin_period(&mut self, directive: &DirectiveConfig, now: DateTime<Utc>) {
        self.directive_key = directive.key.clone();
        self.required = directive.flag_quota;
        self.period = Duration::hours(i64::from(directive.time_limit_hours));
        self.deadline = now + self.period;
        self.actions_taken = 0;
        self.no_actions = 0;
        self.delays = 0;
        self.deadline_missed = false;
        self.score = 0.0;
    }

    pub fn status(&self) -> OperatorStatus {
        self.status
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn quota_met(&self) -> bool {
        self.actions_taken >= self.required
    }

    pub fn quota_shortfall(&self) -> u32 {
        self.required.saturating_sub(self.actions_taken)
    }

    pub fn shortfall_ratio(&self) -> f64 {
        if self.required == 0 {
            return 0.0;
        }
        f64::from(self.quota_shortfall()) / f64::from(self.required)
    }

    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    pub fn metrics(&self) -> ReluctanceMetrics {
        ReluctanceMetrics {
            reluctance_score: self.score,
            no_action_count: self.total_no_actions,
            hesitation_count: self.total_hesitations,
            actions_taken: self.actions_taken,
            actions_required: self.required,
            quota_shortfall: self.quota_shortfall(),
            warnings: self.warnings,
            under_review: self.status == OperatorStatus::UnderReview,
            missed_deadlines: self.missed_deadlines,
            deadline: self.deadline,
        }
    }

    // --- Recording ---

    pub fn record_action(&mut self, cfg: &ReluctanceConfig) -> ReluctanceVerdict {
        if self.status == OperatorStatus::Terminated {
            return ReluctanceVerdict::None;
        }
        self.actions_taken += 1;
        let verdict = self.recompute(cfg);
        if verdict != ReluctanceVerdict::None {
            return verdict;
        }
        if self.quota_met() && self.status == OperatorStatus::UnderReview {
            self.status = OperatorStatus::Active;
            return ReluctanceVerdict::Cleared;
        }
        ReluctanceVerdict::None
    }

    pub fn record_no_action(&mut self, cfg: &ReluctanceConfig) -> ReluctanceVerdict {
        if self.status == OperatorStatus::Terminated {
            return ReluctanceVerdict::None;
        }
        self.no_actions += 1;
        self.total_no_actions += 1;
        self.recompute(cfg)
    }

    /// A decision that came too long after its assessment.
    pub fn record_delay(&mut self, cfg: &ReluctanceConfig) -> ReluctanceVerdict {
        if self.status == OperatorStatus::Terminated {
            return ReluctanceVerdict::None;
        }
        self.delays += 1;
        self.total_hesitations += 1;
        self.recompute(cfg)
    }

    /// If the deadline passed with the quota unmet, count the miss, open a
    /// new period for the same directive and return the violation verdict.
    pub fn check_deadline(&mut self, cfg: &ReluctanceConfig, now: DateTime<Utc>) -> ReluctanceVerdict {
        if self.status == OperatorStatus::Terminated
            || !self.deadline_elapsed(now)
            || self.quota_met()
        {
            return ReluctanceVerdict::None;
        }
        self.deadline_missed = true;
        self.missed_deadlines += 1;
        self.score = self.score.max(self.raw_score(cfg));
        self.deadline = now + self.period;
        self.violation(format!(
            "missed deadline for {} with {} of {} flags",
            self.directive_key, self.actions_taken, self.required
        ))
    }

    // --- Scoring ---

    /// Weighted shortfall and hesitation, clamped to 0-100. Shortfall only
    /// counts once a deadline of the current directive has been missed.
    fn raw_score(&self, cfg: &ReluctanceConfig) -> f64 {
        let shortfall = if self.deadline_missed {
            self.shortfall_ratio()
        } else {
            0.0
        };
        let decisions = self.actions_taken + self.no_actions;
        let hesitation_rate = if decisions == 0 {
            0.0
        } else {
            f64::from(self.no_actions) / f64::from(decisions)
        };
        let raw = cfg.shortfall_weight * shortfall
            + cfg.hesitation_weight * hesitation_rate
            + cfg.no_action_penalty * f64::from(self.no_actions)
            + cfg.delay_penalty * f64::from(self.delays);
        raw.clamp(0.0, 100.0)
    }

    /// Score never decreases within a period.
    fn recompute(&mut self, cfg: &ReluctanceConfig) -> ReluctanceVerdict {
        let previous = self.score;
        self.score = previous.max(self.raw_score(cfg));
        if previous < cfg.warning_threshold && self.score >= cfg.warning_threshold {
            return self.violation(format!(
                "reluctance score {:.0} reached warning threshold {:.0}",
                self.score, cfg.warning_threshold
            ));
        }
        ReluctanceVerdict::None
    }

    fn violation(&mut self, reason: String) -> ReluctanceVerdict {
        match self.status {
            OperatorStatus::Active => {
                self.status = OperatorStatus::UnderReview;
                self.warnings += 1;
                ReluctanceVerdict::Warned { reason }
            }
            OperatorStatus::UnderReview => {
                self.status = OperatorStatus::Terminated;
                ReluctanceVerdict::Terminated { reason }
            }
            OperatorStatus::Terminated => ReluctanceVerdict::None,
        }
    }
}
