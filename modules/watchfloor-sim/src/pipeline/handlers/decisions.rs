//! Public reaction to operator decisions.

use anyhow::Result;
use tracing::info;
use watchfloor_common::{ArticleKind, Metric, SimError};

use crate::pipeline::events::{MetricSource, SimEvent};
use crate::pipeline::handlers::{drain_status_changes, draft_article};
use crate::pipeline::state::{SessionDeps, SessionState};
use crate::news::{ArticleTrigger, Story};
use crate::outcomes::CitizenFlag;
use crate::protest::{ProtestSimulator, ProtestTrigger};

/// A flag lands: status changes, metric deltas, coverage, unrest in the
/// target's neighborhood and, when the quota is met, directive completion.
pub(crate) fn handle_flag_submitted(
    flag: &CitizenFlag,
    detected: bool,
    neighborhood: &str,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Result<Vec<SimEvent>> {
    let catalog = &deps.catalog;
    let action = catalog.action(flag.flag_type).ok_or_else(|| {
        SimError::ConfigurationMissing(format!("no action configured for {}", flag.flag_type))
    })?;
    let at = flag.submitted_at;
    let mut out = drain_status_changes(state);

    if !action.deltas.is_zero() {
        out.push(SimEvent::MetricsShifted {
            source: MetricSource::Action { flag_id: flag.id },
            deltas: action.deltas,
            at,
        });
    }

    let headlines = &catalog.news.headlines;
    let vars = vec![
        ("neighborhood", neighborhood.to_string()),
        ("flag_type", flag.flag_type.to_string()),
    ];

    if action.newsworthiness >= catalog.news.reporting_threshold {
        let story = Story {
            kind: ArticleKind::Triggered,
            headline: &headlines.action,
            vars: vars.clone(),
            deltas: action.deltas,
            trigger: Some(ArticleTrigger::Action { flag_id: flag.id }),
        };
        out.extend(draft_article(state, deps, story, false, at));
    }

    if detected {
        info!(operator = %state.operator_code, flag_id = %flag.id, "operator action exposed");
        let story = Story {
            kind: ArticleKind::Exposure,
            headline: &headlines.exposure,
            vars,
            deltas: catalog.news.exposure_deltas,
            trigger: Some(ArticleTrigger::Action { flag_id: flag.id }),
        };
        out.extend(draft_article(state, deps, story, true, at));
    }

    if action.triggers_protest {
        let busy = state
            .protests
            .iter()
            .any(|p| p.is_live() && p.neighborhood.eq_ignore_ascii_case(neighborhood));
        if let Some(hood) = catalog.neighborhood(neighborhood).filter(|_| !busy) {
            let anger_tier = state.metrics.tier(Metric::Anger);
            let formed = ProtestSimulator::new(&catalog.protests).form(
                hood,
                anger_tier,
                ProtestTrigger::Action { flag_id: flag.id },
                state.rng.as_mut(),
                at,
            );
            out.extend(formed.map(|protest| SimEvent::ProtestFormed { protest }));
        }
    }

    if let Some(directive_key) = state.pending_completion.take() {
        if !state.is_terminated() {
            out.push(SimEvent::DirectiveCompleted { directive_key, at });
        }
    }

    Ok(out)
}
