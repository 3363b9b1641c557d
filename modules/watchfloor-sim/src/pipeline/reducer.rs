//! Pure state updates for an operator session.
//!
//! The reducer sees every event and applies it to `SessionState`. No I/O,
//! no random draws. Values the router must act on (tier crossings, status
//! changes, a met quota) are stashed on the state.

use std::sync::Arc;

use tracing::warn;
use watchfloor_common::{BookStatus, Catalog, OperatorStatus};
use watchfloor_engine::Reducer;

use crate::pipeline::events::SimEvent;
use crate::pipeline::state::{FlagRecord, NoActionRecord, SessionState, StatusChange};
use crate::directive::widen_domains;
use crate::reluctance::ReluctanceVerdict;

pub struct SessionReducer {
    catalog: Arc<Catalog>,
}

impl SessionReducer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

impl Reducer<SimEvent, SessionState> for SessionReducer {
    fn reduce(&self, state: &mut SessionState, event: &SimEvent) {
        let reluctance = &self.catalog.reluctance;

        match event {
            // Decisions
            SimEvent::CitizenAssessed { citizen_id, at, .. } => {
                state.assessed_at.insert(*citizen_id, *at);
                state.assessments += 1;
            }
            SimEvent::FlagSubmitted {
                flag,
                outcome,
                citizen_name,
                neighborhood,
                dependents,
                hesitated,
            } => {
                if *hesitated {
                    let before = state.status();
                    let verdict = state.reluctance.record_delay(reluctance);
                    stash_verdict(state, before, verdict);
                }
                let before = state.status();
                let verdict = state.reluctance.record_action(reluctance);
                stash_verdict(state, before, verdict);

                if outcome.detected {
                    let penalty = self
                        .catalog
                        .action(flag.flag_type)
                        .map_or(0.0, |a| a.detection_compliance_penalty);
                    state.adjust_compliance(-penalty);
                }

                state.outcomes.store(outcome.clone());
                state.flags.push(FlagRecord {
                    flag: flag.clone(),
                    citizen_name: citizen_name.clone(),
                    neighborhood: neighborhood.clone(),
                    dependents: *dependents,
                    detected: outcome.detected,
                });

                if state.reluctance.quota_met()
                    && !state.period_completed
                    && !state.campaign_complete
                    && !state.is_terminated()
                {
                    state.period_completed = true;
                    state.pending_completion = Some(state.directive_key.clone());
                }
            }
            SimEvent::NoActionSubmitted {
                citizen_id,
                reason,
                hesitated,
                at,
            } => {
                state.no_actions.push(NoActionRecord {
                    citizen_id: *citizen_id,
                    reason: reason.clone(),
                    at: *at,
                });
                state.adjust_compliance(-reluctance.compliance_no_action_decay);
                if *hesitated {
                    let before = state.status();
                    let verdict = state.reluctance.record_delay(reluctance);
                    stash_verdict(state, before, verdict);
                }
                let before = state.status();
                let verdict = state.reluctance.record_no_action(reluctance);
                stash_verdict(state, before, verdict);
            }

            // Operator standing
            SimEvent::DeadlineMissed { at, .. } => {
                let ratio = state.reluctance.shortfall_ratio();
                let before = state.status();
                let verdict = state.reluctance.check_deadline(reluctance, *at);
                if verdict != ReluctanceVerdict::None {
                    state.adjust_compliance(-reluctance.compliance_miss_decay * ratio);
                }
                stash_verdict(state, before, verdict);
            }

            // Public metrics
            SimEvent::MetricsShifted { deltas, .. } => {
                let crossings = state.metrics.apply(*deltas);
                state.pending_tier_events.extend(crossings);
            }

            // News
            SimEvent::ArticleDrafted { article } => {
                state.newsroom.add(article.clone());
            }
            SimEvent::ArticlePublished { article_id, at, .. } => {
                state.newsroom.publish(*article_id, *at);
            }
            SimEvent::ArticleSuppressed { article_id, .. } => {
                state.newsroom.suppress(*article_id);
            }
            SimEvent::ChannelBanned { channel_key, .. } => {
                state
                    .newsroom
                    .ban(channel_key, self.catalog.news.censorship_credibility_boost);
            }

            // Protests
            SimEvent::ProtestFormed { protest } => {
                if state.protest(protest.id).is_none() {
                    state.protests.push(protest.clone());
                }
            }
            SimEvent::ProtestStatusChanged { transition } => {
                if let Some(protest) = state.protest_mut(transition.protest_id) {
                    protest.apply(transition);
                }
            }
            SimEvent::IncitingAgentDiscovered { protest_id, .. } => {
                if let Some(protest) = state.protest_mut(*protest_id) {
                    protest.discover_agent();
                }
            }

            // Books
            SimEvent::BookAnnounced { book } => {
                if state.book(book.id).is_none() {
                    state.books.push(book.clone());
                }
            }
            SimEvent::BookPublished { book_id, at } => {
                if let Some(book) = state.book_mut(*book_id) {
                    book.resolve(BookStatus::Published, *at);
                }
            }
            SimEvent::BookBanned { book_id, at } => {
                if let Some(book) = state.book_mut(*book_id) {
                    book.resolve(BookStatus::Banned, *at);
                }
            }

            // Directive progression
            SimEvent::DirectiveCompleted { directive_key, .. } => {
                state.adjust_compliance(reluctance.compliance_recovery);
                state.directives_completed.push(directive_key.clone());
            }
            SimEvent::DirectiveAdvanced { to, week, at, .. } => {
                let Some(directive) = self.catalog.directive(to) else {
                    warn!(directive = %to, "advanced to a directive missing from the catalogue");
                    return;
                };
                state.directive_key = directive.key.clone();
                state.week = *week;
                state.enabled_domains = widen_domains(&state.enabled_domains, directive);
                state.reluctance.begin_period(directive, *at);
                state.period_completed = false;
            }
            SimEvent::CampaignCompleted { .. } => {
                state.campaign_complete = true;
            }

            SimEvent::Ticked { .. } => {
                state.ticks += 1;
            }

            // Audit records; the state they describe is already applied
            SimEvent::SessionStarted { .. }
            | SimEvent::SessionEnded { .. }
            | SimEvent::TierCrossed { .. }
            | SimEvent::OperatorStatusChanged { .. } => {}
        }
    }
}

fn stash_verdict(
    state: &mut SessionState,
    before: OperatorStatus,
    verdict: ReluctanceVerdict,
) {
    let Some(to) = verdict.next_status() else {
        return;
    };
    let reason = match verdict {
        ReluctanceVerdict::Warned { reason } | ReluctanceVerdict::Terminated { reason } => reason,
        ReluctanceVerdict::Cleared => "quota met while under review".to_string(),
        ReluctanceVerdict::None => return,
    };
    state.pending_status_changes.push(StatusChange {
        from: before,
        to,
        reason,
    });
}
