//! Per-operator session state managed by the reducer.
//!
//! `SessionState` is the only mutable state of an operator session. Facts
//! are applied in the reducer; the router reads state, draws from the
//! session's random source, and drains the values the reducer stashed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use watchfloor_common::catalog::DirectiveConfig;
use watchfloor_common::{Catalog, Domain, FlagType, Metric, OperatorStatus, SimError, SimResult};

use crate::books::BookEvent;
use crate::directive::{widen_domains, SessionFields};
use crate::metrics::{PublicMetrics, TierEvent};
use crate::news::Newsroom;
use crate::outcomes::{CitizenFlag, OutcomeCache};
use crate::protest::Protest;
use crate::random::RandomSource;
use crate::reluctance::ReluctanceTracker;

/// A submitted flag with the target details the summaries need.
#[derive(Debug, Clone)]
pub struct FlagRecord {
    pub flag: CitizenFlag,
    pub citizen_name: String,
    pub neighborhood: String,
    pub dependents: u32,
    pub detected: bool,
}

#[derive(Debug, Clone)]
pub struct NoActionRecord {
    pub citizen_id: Uuid,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Status change decided by the reducer, emitted by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub from: OperatorStatus,
    pub to: OperatorStatus,
    pub reason: String,
}

pub struct SessionState {
    pub operator_id: Uuid,
    pub operator_code: String,
    pub started_at: DateTime<Utc>,

    // Directive progression
    pub directive_key: String,
    pub week: u32,
    pub enabled_domains: BTreeSet<Domain>,
    pub directives_completed: Vec<String>,
    /// Quota of the current directive already met.
    pub period_completed: bool,
    pub campaign_complete: bool,

    // Operator standing
    pub compliance_score: f64,
    pub reluctance: ReluctanceTracker,
    pub assessed_at: HashMap<Uuid, DateTime<Utc>>,
    pub assessments: u32,

    // Decisions
    pub flags: Vec<FlagRecord>,
    pub outcomes: OutcomeCache,
    pub no_actions: Vec<NoActionRecord>,

    // World
    pub metrics: PublicMetrics,
    pub protests: Vec<Protest>,
    pub newsroom: Newsroom,
    pub books: Vec<BookEvent>,
    pub ticks: u32,

    /// Source of every random draw in this session.
    pub rng: Box<dyn RandomSource>,

    /// Tier crossings stashed by the reducer for the router.
    pub pending_tier_events: Vec<TierEvent>,
    /// Operator status changes stashed by the reducer for the router.
    pub pending_status_changes: Vec<StatusChange>,
    /// Directive whose quota was just met, stashed for the router.
    pub pending_completion: Option<String>,
}

impl SessionState {
    pub fn new(
        catalog: &Catalog,
        operator_id: Uuid,
        operator_code: String,
        rng: Box<dyn RandomSource>,
        now: DateTime<Utc>,
    ) -> SimResult<Self> {
        let directive = catalog.first_directive()?;
        Ok(Self {
            operator_id,
            operator_code,
            started_at: now,
            directive_key: directive.key.clone(),
            week: directive.week,
            enabled_domains: widen_domains(&BTreeSet::new(), directive),
            directives_completed: Vec::new(),
            period_completed: false,
            campaign_complete: false,
            compliance_score: catalog.reluctance.compliance_start.clamp(0.0, 100.0),
            reluctance: ReluctanceTracker::new(directive, now),
            assessed_at: HashMap::new(),
            assessments: 0,
            flags: Vec::new(),
            outcomes: OutcomeCache::default(),
            no_actions: Vec::new(),
            metrics: PublicMetrics::new(&catalog.tiers),
            protests: Vec::new(),
            newsroom: Newsroom::new(&catalog.channels),
            books: Vec::new(),
            ticks: 0,
            rng,
            pending_tier_events: Vec::new(),
            pending_status_changes: Vec::new(),
            pending_completion: None,
        })
    }

    pub fn status(&self) -> OperatorStatus {
        self.reluctance.status()
    }

    pub fn is_terminated(&self) -> bool {
        self.status() == OperatorStatus::Terminated
    }

    pub fn directive<'c>(&self, catalog: &'c Catalog) -> SimResult<&'c DirectiveConfig> {
        catalog.directive(&self.directive_key).ok_or_else(|| {
            SimError::ConfigurationMissing(format!("directive {} not in catalogue", self.directive_key))
        })
    }

    /// Operator commands are refused once the operator is terminated.
    /// Termination is absorbing, so every later call fails the same way.
    pub fn ensure_active(&self) -> SimResult<()> {
        if self.is_terminated() {
            return Err(SimError::InvalidState(format!(
                "operator {} is terminated",
                self.operator_code
            )));
        }
        Ok(())
    }

    pub fn has_flag(&self, citizen_id: Uuid, flag_type: FlagType) -> bool {
        self.flags
            .iter()
            .any(|r| r.flag.citizen_id == citizen_id && r.flag.flag_type == flag_type)
    }

    pub fn flag(&self, flag_id: Uuid) -> Option<&FlagRecord> {
        self.flags.iter().find(|r| r.flag.id == flag_id)
    }

    pub fn protest(&self, protest_id: Uuid) -> Option<&Protest> {
        self.protests.iter().find(|p| p.id == protest_id)
    }

    pub fn protest_mut(&mut self, protest_id: Uuid) -> Option<&mut Protest> {
        self.protests.iter_mut().find(|p| p.id == protest_id)
    }

    pub fn book(&self, book_id: Uuid) -> Option<&BookEvent> {
        self.books.iter().find(|b| b.id == book_id)
    }

    pub fn book_mut(&mut self, book_id: Uuid) -> Option<&mut BookEvent> {
        self.books.iter_mut().find(|b| b.id == book_id)
    }

    /// Flags plus explicit no-action decisions.
    pub fn reviews_completed(&self) -> u32 {
        (self.flags.len() + self.no_actions.len()) as u32
    }

    /// A decision is hesitant when it comes too long after the citizen was assessed.
    pub fn is_hesitant(&self, citizen_id: Uuid, threshold_secs: u64, now: DateTime<Utc>) -> bool {
        self.assessed_at
            .get(&citizen_id)
            .is_some_and(|at| (now - *at).num_seconds() > threshold_secs as i64)
    }

    /// Deadline passed with the quota unmet and nothing yet recorded for it.
    pub fn deadline_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminated()
            && !self.campaign_complete
            && self.reluctance.deadline_elapsed(now)
            && !self.reluctance.quota_met()
    }

    pub fn adjust_compliance(&mut self, delta: f64) {
        self.compliance_score = (self.compliance_score + delta).clamp(0.0, 100.0);
    }

    pub fn session_fields(&self) -> SessionFields {
        SessionFields {
            compliance_score: self.compliance_score,
            reluctance_score: self.reluctance.score(),
            awareness: self.metrics.awareness(),
            anger: self.metrics.anger(),
            awareness_tier: self.metrics.tier(Metric::Awareness),
            anger_tier: self.metrics.tier(Metric::Anger),
            flags_submitted: self.flags.len() as u32,
            warnings: self.reluctance.warnings(),
            week: self.week,
        }
    }
}

/// Everything handlers need besides state.
#[derive(Clone)]
pub struct SessionDeps {
    pub catalog: Arc<Catalog>,
}

impl SessionDeps {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}
