//! The simulation service: one exclusive session per operator.
//!
//! Every operation locks the operator's session for its whole duration.
//! Sessions share nothing but the catalogue and the collaborators in
//! [`SimulationDeps`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use watchfloor_common::{
    BookStatus, Catalog, CitizenSnapshot, FlagType, Metric, ProtestStatus, RiskLevel, SimError,
    SimResult,
};
use watchfloor_engine::StoredEvent;

use crate::books::BookEvent;
use crate::directive::matches_target;
use crate::news::{Article, Channel};
use crate::outcomes::{CitizenFlag, OutcomeResolver};
use crate::pipeline::{Session, SessionDeps, SessionState, SimEvent};
use crate::protest::{Protest, ProtestSimulator};
use crate::random::{seed_for, RandomSource, SeededRandom};
use crate::risk::{RiskAssessment, RiskScorer};
use crate::traits::{CitizenDirectory, Clock, SystemClock};
use crate::views::{
    Dashboard, DirectiveView, FlagResult, MetricsView, NoActionResult, OperatorImpactSummary,
    OutcomeTimeline, QueueEntry, TickReport,
};

/// Builds the random source for a new session from its operator id.
pub type RngFactory = Arc<dyn Fn(Uuid) -> Box<dyn RandomSource> + Send + Sync>;

/// Shared collaborators for every session.
#[derive(Clone, TypedBuilder)]
pub struct SimulationDeps {
    pub catalog: Arc<Catalog>,
    pub directory: Arc<dyn CitizenDirectory>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    pub clock: Arc<dyn Clock>,
    /// Base seed; each session derives its own from it.
    #[builder(default)]
    pub seed: Option<u64>,
    #[builder(default)]
    pub rng_factory: Option<RngFactory>,
}

pub struct Simulation {
    deps: SimulationDeps,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
    /// flag id → operator id
    flag_index: RwLock<HashMap<Uuid, Uuid>>,
}

impl Simulation {
    pub fn new(deps: SimulationDeps) -> SimResult<Self> {
        deps.catalog.validate()?;
        Ok(Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
            flag_index: RwLock::new(HashMap::new()),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.deps.catalog
    }

    // --- Session lifecycle ---

    /// Create an ACTIVE operator on the week-1 directive.
    pub async fn start_session(&self, operator_code: &str) -> SimResult<Dashboard> {
        let operator_id = Uuid::new_v4();
        let now = self.deps.clock.now();
        let (rng, seed) = self.random_source(operator_id, operator_code);

        let state = SessionState::new(
            &self.deps.catalog,
            operator_id,
            operator_code.to_string(),
            rng,
            now,
        )?;
        let mut session = Session::new(state, SessionDeps::new(self.deps.catalog.clone()));
        session
            .dispatch(SimEvent::SessionStarted {
                operator_id,
                operator_code: operator_code.to_string(),
                directive_key: session.state.directive_key.clone(),
                enabled_domains: session.state.enabled_domains.iter().copied().collect(),
                seed,
                at: now,
            })
            .await?;
        info!(
            operator_id = %operator_id,
            operator = operator_code,
            directive = %session.state.directive_key,
            seed,
            "session started"
        );

        let dashboard = self.build_dashboard(&session).await?;
        self.sessions
            .write()
            .await
            .insert(operator_id, Arc::new(Mutex::new(session)));
        Ok(dashboard)
    }

    /// Destroy a session and its flag index entries. Returns the final summary.
    pub async fn end_session(&self, operator_id: Uuid) -> SimResult<OperatorImpactSummary> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&operator_id)
            .ok_or_else(|| SimError::not_found("operator", operator_id))?;
        let mut session = handle.lock().await;

        let at = self.deps.clock.now();
        session
            .dispatch(SimEvent::SessionEnded { operator_id, at })
            .await?;
        self.flag_index
            .write()
            .await
            .retain(|_, owner| *owner != operator_id);

        info!(operator_id = %operator_id, events = session.event_count(), "session ended");
        Ok(impact_summary(&session))
    }

    // --- Reads ---

    pub async fn get_dashboard(&self, operator_id: Uuid) -> SimResult<Dashboard> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        self.sync_deadline(&mut session).await?;
        self.build_dashboard(&session).await
    }

    /// Fresh assessment from the domains the operator can see. Records when
    /// the citizen was assessed so hesitation can be measured.
    pub async fn assess_risk(&self, operator_id: Uuid, citizen_id: Uuid) -> SimResult<RiskAssessment> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;

        let snapshot = self.snapshot(citizen_id).await?;
        let now = self.deps.clock.now();
        let assessment =
            RiskScorer::new(&self.deps.catalog).assess(&snapshot, &session.state.enabled_domains, now);

        session
            .dispatch(SimEvent::CitizenAssessed {
                citizen_id,
                score: assessment.score,
                at: now,
            })
            .await?;
        Ok(assessment)
    }

    pub async fn get_outcome_timeline(&self, flag_id: Uuid) -> SimResult<OutcomeTimeline> {
        let operator_id = self
            .flag_index
            .read()
            .await
            .get(&flag_id)
            .copied()
            .ok_or_else(|| SimError::not_found("flag", flag_id))?;
        let handle = self.session(operator_id).await?;
        let session = handle.lock().await;

        let record = session
            .state
            .flag(flag_id)
            .ok_or_else(|| SimError::not_found("flag", flag_id))?;
        let outcome = session
            .state
            .outcomes
            .get(flag_id)
            .ok_or_else(|| SimError::not_found("outcome", flag_id))?;

        Ok(OutcomeTimeline {
            flag_id,
            citizen_id: record.flag.citizen_id,
            citizen_name: record.citizen_name.clone(),
            flag_type: record.flag.flag_type,
            justification: record.flag.justification.clone(),
            risk_score: record.flag.risk_score,
            detected: outcome.detected,
            submitted_at: record.flag.submitted_at,
            entries: outcome.entries.clone(),
        })
    }

    pub async fn get_operator_impact_summary(&self, operator_id: Uuid) -> SimResult<OperatorImpactSummary> {
        let handle = self.session(operator_id).await?;
        let session = handle.lock().await;
        Ok(impact_summary(&session))
    }

    /// The session's causal event log, oldest first.
    pub async fn events(&self, operator_id: Uuid) -> SimResult<Vec<StoredEvent>> {
        let handle = self.session(operator_id).await?;
        let session = handle.lock().await;
        Ok(session.events())
    }

    // --- Decisions ---

    pub async fn submit_flag(
        &self,
        operator_id: Uuid,
        citizen_id: Uuid,
        flag_type: FlagType,
        justification: &str,
    ) -> SimResult<FlagResult> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        self.sync_deadline(&mut session).await?;
        self.ensure_can_decide(&session.state)?;

        if session.state.has_flag(citizen_id, flag_type) {
            return Err(SimError::Conflict(format!(
                "citizen {citizen_id} already flagged for {flag_type}"
            )));
        }

        let snapshot = self.snapshot(citizen_id).await?;
        let now = self.deps.clock.now();
        let (risk_score, _) =
            RiskScorer::new(&self.deps.catalog).score(&snapshot, &session.state.enabled_domains);

        let flag = CitizenFlag {
            id: Uuid::new_v4(),
            operator_id,
            citizen_id,
            flag_type,
            justification: justification.to_string(),
            risk_score,
            submitted_at: now,
        };
        let outcome = OutcomeResolver::new(&self.deps.catalog).resolve(
            &flag,
            &snapshot,
            session.state.rng.as_mut(),
        )?;
        let detected = outcome.detected;
        let hesitated = session.state.is_hesitant(
            citizen_id,
            self.deps.catalog.reluctance.hesitation_threshold_secs,
            now,
        );

        let dispatched = session
            .dispatch(SimEvent::FlagSubmitted {
                flag: flag.clone(),
                outcome,
                citizen_name: snapshot.name.clone(),
                neighborhood: snapshot.neighborhood.clone(),
                dependents: snapshot.dependents,
                hesitated,
            })
            .await;
        if session.state.flag(flag.id).is_some() {
            self.flag_index.write().await.insert(flag.id, operator_id);
        }
        dispatched?;

        info!(
            operator_id = %operator_id,
            flag_id = %flag.id,
            %flag_type,
            risk_score,
            detected,
            hesitated,
            "flag submitted"
        );

        let state = &session.state;
        Ok(FlagResult {
            flag_id: flag.id,
            citizen_id,
            flag_type,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            detected,
            hesitated,
            immediate_outcome: state
                .outcomes
                .get(flag.id)
                .and_then(|o| o.entries.first().cloned()),
            operator_status: state.status(),
            compliance_score: state.compliance_score,
            directive_key: state.directive_key.clone(),
            campaign_complete: state.campaign_complete,
        })
    }

    pub async fn submit_no_action(
        &self,
        operator_id: Uuid,
        citizen_id: Uuid,
        reason: &str,
    ) -> SimResult<NoActionResult> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        self.sync_deadline(&mut session).await?;
        self.ensure_can_decide(&session.state)?;

        self.snapshot(citizen_id).await?;
        let now = self.deps.clock.now();
        let hesitated = session.state.is_hesitant(
            citizen_id,
            self.deps.catalog.reluctance.hesitation_threshold_secs,
            now,
        );

        session
            .dispatch(SimEvent::NoActionSubmitted {
                citizen_id,
                reason: reason.to_string(),
                hesitated,
                at: now,
            })
            .await?;

        let state = &session.state;
        info!(
            operator_id = %operator_id,
            citizen_id = %citizen_id,
            reluctance = state.reluctance.score(),
            "no action submitted"
        );
        Ok(NoActionResult {
            citizen_id,
            hesitated,
            operator_status: state.status(),
            compliance_score: state.compliance_score,
            reluctance: state.reluctance.metrics(),
        })
    }

    // --- Time ---

    /// Advance the world one step.
    pub async fn tick(&self, operator_id: Uuid) -> SimResult<TickReport> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        let at = self.deps.clock.now();
        let handled = session.dispatch(SimEvent::Ticked { at }).await?;

        let mut report = TickReport {
            tick: session.state.ticks,
            articles_published: 0,
            articles_drafted: 0,
            protest_changes: Vec::new(),
            protests_formed: 0,
            books_announced: 0,
            books_published: 0,
            deadline_missed: false,
            operator_status: session.state.status(),
        };
        for event in handled {
            match event {
                SimEvent::ArticlePublished { .. } => report.articles_published += 1,
                SimEvent::ArticleDrafted { .. } => report.articles_drafted += 1,
                SimEvent::ProtestStatusChanged { transition } => report.protest_changes.push(transition),
                SimEvent::ProtestFormed { .. } => report.protests_formed += 1,
                SimEvent::BookAnnounced { .. } => report.books_announced += 1,
                SimEvent::BookPublished { .. } => report.books_published += 1,
                SimEvent::DeadlineMissed { .. } => report.deadline_missed = true,
                _ => {}
            }
        }
        Ok(report)
    }

    // --- Operator interventions ---

    pub async fn suppress_protest(&self, operator_id: Uuid, protest_id: Uuid) -> SimResult<Protest> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;

        let protest = session
            .state
            .protest(protest_id)
            .ok_or_else(|| SimError::not_found("protest", protest_id))?;
        let transition =
            ProtestSimulator::new(&self.deps.catalog.protests).suppress(protest, self.deps.clock.now())?;
        session
            .dispatch(SimEvent::ProtestStatusChanged { transition })
            .await?;

        warn!(operator_id = %operator_id, protest_id = %protest_id, "protest suppressed");
        self.protest_view(&session, protest_id)
    }

    /// Look for an inciting agent in a live protest. Returns whether one was exposed.
    pub async fn investigate_protest(&self, operator_id: Uuid, protest_id: Uuid) -> SimResult<bool> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;

        let protest = session
            .state
            .protest(protest_id)
            .ok_or_else(|| SimError::not_found("protest", protest_id))?;
        protest.check_investigable()?;
        if !protest.agent_exposable() {
            return Ok(false);
        }

        let at = self.deps.clock.now();
        session
            .dispatch(SimEvent::IncitingAgentDiscovered { protest_id, at })
            .await?;
        info!(operator_id = %operator_id, protest_id = %protest_id, "inciting agent discovered");
        Ok(true)
    }

    pub async fn suppress_article(&self, operator_id: Uuid, article_id: Uuid) -> SimResult<Article> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;
        session.state.newsroom.check_suppressible(article_id)?;

        let at = self.deps.clock.now();
        session
            .dispatch(SimEvent::ArticleSuppressed { article_id, at })
            .await?;
        info!(operator_id = %operator_id, article_id = %article_id, "article suppressed");

        session
            .state
            .newsroom
            .article(article_id)
            .cloned()
            .ok_or_else(|| SimError::not_found("article", article_id))
    }

    pub async fn ban_channel(&self, operator_id: Uuid, channel_key: &str) -> SimResult<Channel> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;
        session.state.newsroom.check_bannable(channel_key)?;

        let at = self.deps.clock.now();
        session
            .dispatch(SimEvent::ChannelBanned {
                channel_key: channel_key.to_string(),
                at,
            })
            .await?;

        session
            .state
            .newsroom
            .channel(channel_key)
            .cloned()
            .ok_or_else(|| SimError::not_found("channel", channel_key))
    }

    pub async fn ban_book(&self, operator_id: Uuid, book_id: Uuid) -> SimResult<BookEvent> {
        let handle = self.session(operator_id).await?;
        let mut session = handle.lock().await;
        session.state.ensure_active()?;

        session
            .state
            .book(book_id)
            .ok_or_else(|| SimError::not_found("book", book_id))?
            .check_bannable()?;

        let at = self.deps.clock.now();
        session.dispatch(SimEvent::BookBanned { book_id, at }).await?;
        info!(operator_id = %operator_id, book_id = %book_id, "book banned");

        session
            .state
            .book(book_id)
            .cloned()
            .ok_or_else(|| SimError::not_found("book", book_id))
    }

    // --- Internals ---

    async fn session(&self, operator_id: Uuid) -> SimResult<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&operator_id)
            .cloned()
            .ok_or_else(|| SimError::not_found("operator", operator_id))
    }

    async fn snapshot(&self, citizen_id: Uuid) -> SimResult<CitizenSnapshot> {
        self.deps
            .directory
            .snapshot(citizen_id)
            .await?
            .ok_or_else(|| SimError::not_found("citizen", citizen_id))
    }

    fn random_source(&self, operator_id: Uuid, operator_code: &str) -> (Box<dyn RandomSource>, u64) {
        let seeded = match self.deps.seed {
            Some(base) => SeededRandom::new(seed_for(base, operator_code)),
            None => SeededRandom::unseeded(),
        };
        let seed = seeded.seed();
        match &self.deps.rng_factory {
            Some(factory) => (factory(operator_id), seed),
            None => (Box::new(seeded), seed),
        }
    }

    /// Terminated operators are refused first; after the final directive the
    /// quota is satisfied for good.
    fn ensure_can_decide(&self, state: &SessionState) -> SimResult<()> {
        state.ensure_active()?;
        if state.campaign_complete {
            return Err(SimError::Conflict(format!(
                "operator {} has satisfied every directive quota",
                state.operator_code
            )));
        }
        Ok(())
    }

    /// Record a missed deadline before anything else happens in the session.
    async fn sync_deadline(&self, session: &mut Session) -> SimResult<()> {
        let now = self.deps.clock.now();
        if !session.state.deadline_due(now) {
            return Ok(());
        }
        warn!(
            operator = %session.state.operator_code,
            directive = %session.state.directive_key,
            shortfall = session.state.reluctance.quota_shortfall(),
            "directive deadline missed"
        );
        session
            .dispatch(SimEvent::DeadlineMissed {
                directive_key: session.state.directive_key.clone(),
                shortfall: session.state.reluctance.quota_shortfall(),
                at: now,
            })
            .await?;
        Ok(())
    }

    fn protest_view(&self, session: &Session, protest_id: Uuid) -> SimResult<Protest> {
        session
            .state
            .protest(protest_id)
            .cloned()
            .ok_or_else(|| SimError::not_found("protest", protest_id))
    }

    async fn build_dashboard(&self, session: &Session) -> SimResult<Dashboard> {
        let catalog = &self.deps.catalog;
        let state = &session.state;
        let directive = state.directive(catalog)?;
        let reluctance = state.reluctance.metrics();

        let review_queue = self
            .deps
            .directory
            .citizens()
            .await?
            .iter()
            .map(|c| QueueEntry {
                citizen_id: c.citizen_id,
                name: c.name.clone(),
                neighborhood: c.neighborhood.clone(),
                matches_directive: matches_target(catalog, directive, c, &state.enabled_domains),
                already_flagged: state.flags.iter().any(|r| r.flag.citizen_id == c.citizen_id),
            })
            .collect();

        let label = |metric: Metric| {
            catalog
                .tier_names(metric)
                .get(usize::from(state.metrics.tier(metric)))
                .cloned()
                .unwrap_or_default()
        };

        let articles = state.newsroom.articles();
        let mut recent: Vec<Article> = articles
            .iter()
            .filter(|a| a.published_at.is_some())
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        recent.truncate(5);

        Ok(Dashboard {
            operator_id: state.operator_id,
            operator_code: state.operator_code.clone(),
            status: state.status(),
            compliance_score: state.compliance_score,
            directive: DirectiveView {
                key: directive.key.clone(),
                week: directive.week,
                title: directive.title.clone(),
                description: directive.description.clone(),
                required_domains: directive.required_domains.clone(),
                flag_quota: directive.flag_quota,
                flags_this_period: reluctance.actions_taken,
                deadline: reluctance.deadline,
                moral_weight: directive.moral_weight,
            },
            enabled_domains: state.enabled_domains.iter().copied().collect(),
            metrics: MetricsView {
                awareness: state.metrics.awareness(),
                anger: state.metrics.anger(),
                awareness_tier: state.metrics.tier(Metric::Awareness),
                anger_tier: state.metrics.tier(Metric::Anger),
                awareness_label: label(Metric::Awareness),
                anger_label: label(Metric::Anger),
            },
            flags_submitted: state.flags.len() as u32,
            reviews_completed: state.reviews_completed(),
            hesitation_incidents: reluctance.hesitation_count,
            reluctance,
            review_queue,
            live_protests: state.protests.iter().filter(|p| p.is_live()).cloned().collect(),
            pending_articles: state.newsroom.pending().cloned().collect(),
            recent_articles: recent,
            channels: state.newsroom.channels().to_vec(),
            pending_books: state.books.iter().filter(|b| b.is_pending()).cloned().collect(),
            campaign_complete: state.campaign_complete,
        })
    }
}

fn impact_summary(session: &Session) -> OperatorImpactSummary {
    let state = &session.state;

    let mut flags_by_type: BTreeMap<FlagType, u32> = BTreeMap::new();
    for record in &state.flags {
        *flags_by_type.entry(record.flag.flag_type).or_default() += 1;
    }
    let mut flagged: Vec<Uuid> = state.flags.iter().map(|r| r.flag.citizen_id).collect();
    flagged.sort();
    flagged.dedup();

    let mut families = HashMap::new();
    for record in &state.flags {
        families.insert(record.flag.citizen_id, record.dependents);
    }

    let mut protests_by_status: BTreeMap<ProtestStatus, u32> = BTreeMap::new();
    for protest in &state.protests {
        *protests_by_status.entry(protest.status).or_default() += 1;
    }

    let articles = state.newsroom.articles();
    OperatorImpactSummary {
        operator_id: state.operator_id,
        operator_code: state.operator_code.clone(),
        status: state.status(),
        compliance_score: state.compliance_score,
        weeks_served: state.week,
        directives_completed: state.directives_completed.clone(),
        flags_by_type,
        citizens_flagged: flagged.len() as u32,
        families_affected: families.values().sum(),
        detections: state.flags.iter().filter(|r| r.detected).count() as u32,
        no_actions: state.no_actions.len() as u32,
        hesitation_incidents: state.reluctance.metrics().hesitation_count,
        awareness: state.metrics.awareness(),
        anger: state.metrics.anger(),
        protests_by_status,
        arrests: state.protests.iter().map(|p| p.arrests).sum(),
        casualties: state.protests.iter().map(|p| p.casualties).sum(),
        articles_published: articles.iter().filter(|a| a.published_at.is_some()).count() as u32,
        articles_suppressed: articles.iter().filter(|a| a.suppressed).count() as u32,
        channels_banned: state
            .newsroom
            .channels()
            .iter()
            .filter(|c| c.banned)
            .map(|c| c.key.clone())
            .collect(),
        books_banned: state
            .books
            .iter()
            .filter(|b| b.status == BookStatus::Banned)
            .map(|b| b.title.clone())
            .collect(),
        event_count: session.event_count(),
    }
}
