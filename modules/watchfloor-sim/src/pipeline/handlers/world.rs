//! How the public, the press and the streets react.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;
use watchfloor_common::catalog::MetricDeltas;
use watchfloor_common::{ArticleKind, Metric, ProtestStatus};

use crate::pipeline::events::{MetricSource, SimEvent};
use crate::pipeline::handlers::draft_article;
use crate::pipeline::state::{SessionDeps, SessionState};
use crate::news::{ArticleTrigger, Story};
use crate::protest::{pick_unrest_site, Protest, ProtestSimulator, ProtestTransition, ProtestTrigger};

/// Tier crossings stashed while applying the deltas.
pub(crate) fn handle_metrics_shifted(
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    std::mem::take(&mut state.pending_tier_events)
        .into_iter()
        .map(|t| SimEvent::TierCrossed {
            metric: t.metric,
            from: t.from,
            to: t.to,
            tier_name: deps
                .catalog
                .tier_names(t.metric)
                .get(usize::from(t.to))
                .cloned()
                .unwrap_or_else(|| format!("tier {}", t.to)),
            at,
        })
        .collect()
}

/// Only upward crossings make news or bring people out.
pub(crate) fn handle_tier_crossed(
    metric: Metric,
    from: u8,
    to: u8,
    tier_name: &str,
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    if to <= from {
        return vec![];
    }
    info!(operator = %state.operator_code, %metric, from, to, tier = tier_name, "tier crossed");

    let catalog = &deps.catalog;
    let mut out = Vec::new();

    let story = Story {
        kind: ArticleKind::Triggered,
        headline: &catalog.news.headlines.tier,
        vars: vec![
            ("metric", metric.to_string()),
            ("tier_name", tier_name.to_string()),
        ],
        deltas: catalog.news.random_deltas,
        trigger: Some(ArticleTrigger::Tier { metric, tier: to }),
    };
    out.extend(draft_article(state, deps, story, false, at));

    if metric == Metric::Anger && to >= catalog.protests.anger_tier_trigger {
        let site = pick_unrest_site(
            &catalog.neighborhoods,
            &state.protests,
            catalog.protests.min_population,
        );
        if let Some(hood) = site {
            let formed = ProtestSimulator::new(&catalog.protests).form(
                hood,
                to,
                ProtestTrigger::AngerTier { tier: to },
                state.rng.as_mut(),
                at,
            );
            out.extend(formed.map(|protest| SimEvent::ProtestFormed { protest }));
        }
    }

    out
}

pub(crate) fn handle_article_published(
    article_id: Uuid,
    deltas: MetricDeltas,
    at: DateTime<Utc>,
) -> Vec<SimEvent> {
    if deltas.is_zero() {
        return vec![];
    }
    vec![SimEvent::MetricsShifted {
        source: MetricSource::Article { article_id },
        deltas,
        at,
    }]
}

/// Censorship is itself news, carried by whichever independent outlet survives.
pub(crate) fn handle_channel_banned(
    channel_key: &str,
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    let banned_name = state
        .newsroom
        .channel(channel_key)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| channel_key.to_string());
    info!(operator = %state.operator_code, channel = channel_key, "channel banned");

    let story = Story {
        kind: ArticleKind::Triggered,
        headline: &deps.catalog.news.headlines.censorship,
        vars: vec![("banned_channel", banned_name)],
        deltas: deps.catalog.news.censorship_deltas,
        trigger: Some(ArticleTrigger::Censorship {
            channel_key: channel_key.to_string(),
        }),
    };
    draft_article(state, deps, story, true, at).into_iter().collect()
}

pub(crate) fn handle_protest_formed(
    protest: &Protest,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    info!(
        operator = %state.operator_code,
        protest_id = %protest.id,
        neighborhood = %protest.neighborhood,
        size = protest.size,
        "protest forming"
    );
    protest_coverage(
        protest.id,
        &protest.neighborhood,
        protest.status,
        protest.size,
        protest.formed_at,
        state,
        deps,
    )
}

pub(crate) fn handle_protest_changed(
    t: &ProtestTransition,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    info!(
        operator = %state.operator_code,
        protest_id = %t.protest_id,
        from = %t.from,
        to = %t.to,
        arrests = t.arrests,
        casualties = t.casualties,
        "protest status changed"
    );
    protest_coverage(t.protest_id, &t.neighborhood, t.to, t.size, t.at, state, deps)
}

fn protest_coverage(
    protest_id: Uuid,
    neighborhood: &str,
    status: ProtestStatus,
    size: u32,
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    let story = Story {
        kind: ArticleKind::Triggered,
        headline: &deps.catalog.news.headlines.protest,
        vars: vec![
            ("neighborhood", neighborhood.to_string()),
            ("status", status.to_string()),
            ("size", size.to_string()),
        ],
        deltas: deps.catalog.protests.article_deltas.for_status(status),
        trigger: Some(ArticleTrigger::Protest { protest_id }),
    };
    draft_article(state, deps, story, false, at).into_iter().collect()
}

/// Publication and bans both move the public; a ban more so in anger.
pub(crate) fn handle_book_resolved(
    book_id: Uuid,
    banned: bool,
    at: DateTime<Utc>,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    let books = &deps.catalog.books;
    let deltas = if banned {
        books.ban_deltas
    } else {
        books.publish_deltas
    };
    if deltas.is_zero() {
        return vec![];
    }
    vec![SimEvent::MetricsShifted {
        source: MetricSource::Book { book_id },
        deltas,
        at,
    }]
}
