//! Directive progression once a quota is met.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::pipeline::events::SimEvent;
use crate::pipeline::state::{SessionDeps, SessionState};
use crate::directive::next_directive;

pub(crate) fn handle_directive_completed(
    directive_key: &str,
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Result<Vec<SimEvent>> {
    info!(
        operator = %state.operator_code,
        directive = directive_key,
        compliance = state.compliance_score,
        "directive quota met"
    );
    if state.is_terminated() || state.campaign_complete {
        return Ok(vec![]);
    }

    let fields = state.session_fields();
    let next = match next_directive(&deps.catalog, &fields) {
        Some(d) => SimEvent::DirectiveAdvanced {
            from: directive_key.to_string(),
            to: d.key.clone(),
            week: d.week,
            at,
        },
        None => SimEvent::CampaignCompleted { at },
    };
    Ok(vec![next])
}
