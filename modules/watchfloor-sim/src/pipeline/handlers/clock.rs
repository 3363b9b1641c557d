//! Time passing: drafts go to print, books come out, crowds move.

use chrono::{DateTime, Utc};
use watchfloor_common::{ArticleKind, Metric};

use crate::books::roll_announcement;
use crate::pipeline::events::SimEvent;
use crate::pipeline::handlers::draft_article;
use crate::pipeline::state::{SessionDeps, SessionState};
use crate::news::Story;
use crate::protest::ProtestSimulator;

/// Everything in the session state before this tick moves forward one step.
/// Work spawned by this tick's own events waits for the next one.
pub(crate) fn handle_ticked(
    at: DateTime<Utc>,
    state: &mut SessionState,
    deps: &SessionDeps,
) -> Vec<SimEvent> {
    let catalog = &deps.catalog;
    let mut out = Vec::new();

    out.extend(state.newsroom.pending().map(|a| SimEvent::ArticlePublished {
        article_id: a.id,
        channel_key: a.channel_key.clone(),
        deltas: a.deltas,
        at,
    }));

    out.extend(
        state
            .books
            .iter()
            .filter(|b| b.is_pending())
            .map(|b| SimEvent::BookPublished { book_id: b.id, at }),
    );

    let anger_tier = state.metrics.tier(Metric::Anger);
    let simulator = ProtestSimulator::new(&catalog.protests);
    for protest in state.protests.iter().filter(|p| p.is_live()) {
        let propensity = catalog
            .neighborhood(&protest.neighborhood)
            .map_or(0.0, |n| n.unrest_propensity);
        if let Some(transition) =
            simulator.step(protest, anger_tier, propensity, state.rng.as_mut(), at)
        {
            out.push(SimEvent::ProtestStatusChanged { transition });
        }
    }

    if state.rng.chance(catalog.news.random_article_chance) {
        let headlines = &catalog.news.headlines.random;
        let headline = state.rng.pick(headlines.len()).map(|i| &headlines[i]);
        let neighborhood = state
            .rng
            .pick(catalog.neighborhoods.len())
            .map(|i| catalog.neighborhoods[i].name.clone())
            .unwrap_or_else(|| catalog.world.city.clone());
        if let Some(headline) = headline {
            let story = Story {
                kind: ArticleKind::Random,
                headline,
                vars: vec![("neighborhood", neighborhood)],
                deltas: catalog.news.random_deltas,
                trigger: None,
            };
            out.extend(draft_article(state, deps, story, false, at));
        }
    }

    let awareness_tier = state.metrics.tier(Metric::Awareness);
    if let Some(book) =
        roll_announcement(&catalog.books, awareness_tier, &state.books, state.rng.as_mut(), at)
    {
        out.push(SimEvent::BookAnnounced { book });
    }

    if state.deadline_due(at) {
        out.push(SimEvent::DeadlineMissed {
            directive_key: state.directive_key.clone(),
            shortfall: state.reluctance.quota_shortfall(),
            at,
        });
    }

    out
}
