//! World reactions: protests, press coverage, censorship and books.
//!
//! Randomness is pinned per test so every escalation path is reachable.
//!
//! Run with: cargo test -p watchfloor-sim --test world_test

mod harness;

use watchfloor_common::{BookStatus, Catalog, FlagType, ProtestStatus, SimError};
use watchfloor_sim::protest::ProtestTrigger;
use watchfloor_sim::testing::high_risk_citizen;

use harness::{directory, organiser, Harness, EVERYTHING_FIRES, NOTHING_FIRES};

// ---------------------------------------------------------------------------
// Reproducibility
// ---------------------------------------------------------------------------

/// Runs the same shift and returns everything the dice decided. Ids are
/// left out; they are fresh per run.
async fn seeded_shift(seed: u64) -> serde_json::Value {
    let h = Harness::seeded(seed);
    let op = h.start().await;

    let mut detections = Vec::new();
    for citizen in [high_risk_citizen(), organiser(1, "Millrow"), organiser(2, "Millrow")] {
        let flag = h
            .sim
            .submit_flag(op, citizen.citizen_id, FlagType::Detention, "organiser")
            .await
            .unwrap();
        detections.push(flag.detected);
    }
    for _ in 0..3 {
        h.sim.tick(op).await.unwrap();
    }

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    let articles: Vec<_> = dashboard
        .recent_articles
        .iter()
        .chain(&dashboard.pending_articles)
        .map(|a| serde_json::json!([a.channel_key, a.headline, a.deltas, a.suppressed]))
        .collect();
    let protests: Vec<_> = dashboard
        .live_protests
        .iter()
        .map(|p| serde_json::json!([p.neighborhood, p.status, p.size, p.agent_present]))
        .collect();
    let summary = h.sim.get_operator_impact_summary(op).await.unwrap();
    let events: Vec<String> = h
        .sim
        .events(op)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();

    serde_json::json!({
        "detections": detections,
        "metrics": [dashboard.metrics.awareness, dashboard.metrics.anger],
        "articles": articles,
        "protests": protests,
        "protests_by_status": summary.protests_by_status,
        "arrests": summary.arrests,
        "casualties": summary.casualties,
        "compliance": summary.compliance_score,
        "events": events,
    })
}

#[tokio::test]
async fn same_seed_replays_the_same_world() {
    let first = seeded_shift(7731).await;
    let second = seeded_shift(7731).await;
    assert_eq!(first, second);
    assert_eq!(first["detections"].as_array().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Protests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detention_sparks_protest_that_can_be_investigated_and_suppressed() {
    let h = Harness::new(EVERYTHING_FIRES);
    let op = h.start().await;

    let flag = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();
    assert!(flag.detected);
    assert_eq!(flag.compliance_score, 90.0);

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.live_protests.len(), 1);
    let protest = dashboard.live_protests[0].clone();
    assert_eq!(protest.neighborhood, "Eastgate");
    assert_eq!(protest.status, ProtestStatus::Forming);
    assert_eq!(protest.trigger, ProtestTrigger::Action { flag_id: flag.flag_id });
    assert!(protest.agent_present);

    let err = h.sim.suppress_protest(op, protest.id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    assert!(h.sim.investigate_protest(op, protest.id).await.unwrap());
    assert!(!h.sim.investigate_protest(op, protest.id).await.unwrap());

    let report = h.sim.tick(op).await.unwrap();
    let change = report
        .protest_changes
        .iter()
        .find(|t| t.protest_id == protest.id)
        .unwrap();
    assert_eq!(change.from, ProtestStatus::Forming);
    assert_eq!(change.to, ProtestStatus::Active);

    let suppressed = h.sim.suppress_protest(op, protest.id).await.unwrap();
    assert_eq!(suppressed.status, ProtestStatus::Suppressed);
    assert!(suppressed.arrests > 0);
    assert!(suppressed.resolved_at.is_some());

    let err = h.sim.investigate_protest(op, protest.id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    let summary = h.sim.get_operator_impact_summary(op).await.unwrap();
    assert!(summary.arrests >= suppressed.arrests);
    assert!(summary.protests_by_status.get(&ProtestStatus::Suppressed).is_some());
}

#[tokio::test]
async fn forming_protest_without_momentum_disperses() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    h.sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Intervention, "home visit")
        .await
        .unwrap();

    let protest = h.sim.get_dashboard(op).await.unwrap().live_protests[0].clone();
    assert!(!protest.agent_present);
    assert!(!h.sim.investigate_protest(op, protest.id).await.unwrap());

    let report = h.sim.tick(op).await.unwrap();
    assert!(report
        .protest_changes
        .iter()
        .any(|t| t.protest_id == protest.id && t.to == ProtestStatus::Dispersed));

    let err = h.sim.suppress_protest(op, protest.id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));
    assert!(h.sim.get_dashboard(op).await.unwrap().live_protests.is_empty());
}

#[tokio::test]
async fn monitoring_does_not_bring_anyone_out() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    h.sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Monitoring, "watch")
        .await
        .unwrap();

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert!(dashboard.live_protests.is_empty());
    assert!(dashboard.pending_articles.is_empty());
}

#[tokio::test]
async fn anger_tier_crossing_forms_protest_in_largest_quiet_neighborhood() {
    let mut catalog = Catalog::builtin().unwrap();
    catalog.protests.anger_tier_trigger = 1;
    let h = Harness::with_catalog(catalog, directory(), NOTHING_FIRES);
    let op = h.start().await;

    h.sim
        .submit_flag(op, organiser(1, "Millrow").citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();

    let protests = h.sim.get_dashboard(op).await.unwrap().live_protests;
    assert_eq!(protests.len(), 2);
    assert!(protests
        .iter()
        .any(|p| p.neighborhood == "Millrow" && matches!(p.trigger, ProtestTrigger::Action { .. })));
    assert!(protests
        .iter()
        .any(|p| p.neighborhood == "Eastgate" && p.trigger == ProtestTrigger::AngerTier { tier: 1 }));
}

#[tokio::test]
async fn unknown_protest_is_not_found() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let err = h
        .sim
        .investigate_protest(op, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::NotFound { kind: "protest", .. }));
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drafts_publish_on_next_tick_unless_suppressed() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    h.sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();

    // Action and protest coverage plus one article per tier crossed.
    let pending = h.sim.get_dashboard(op).await.unwrap().pending_articles;
    assert_eq!(pending.len(), 4);

    let suppressed = h.sim.suppress_article(op, pending[0].id).await.unwrap();
    assert!(suppressed.suppressed);
    assert!(suppressed.deltas.is_zero());
    let err = h.sim.suppress_article(op, pending[0].id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    let report = h.sim.tick(op).await.unwrap();
    assert_eq!(report.tick, 1);
    assert_eq!(report.articles_published, 3);

    let err = h.sim.suppress_article(op, pending[1].id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    // Coverage written during the tick waits for the next one.
    let waiting = h.sim.get_dashboard(op).await.unwrap().pending_articles.len() as u32;
    assert_eq!(report.articles_drafted, waiting);
    let next = h.sim.tick(op).await.unwrap();
    assert_eq!(next.tick, 2);
    assert_eq!(next.articles_published, waiting);

    let summary = h.sim.get_operator_impact_summary(op).await.unwrap();
    assert_eq!(summary.articles_suppressed, 1);
    assert_eq!(summary.articles_published, 3 + waiting);
}

#[tokio::test]
async fn banning_a_channel_kills_its_drafts_and_boosts_independents() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    h.sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();

    let pending = h.sim.get_dashboard(op).await.unwrap().pending_articles;
    let target = pending[0].channel_key.clone();
    assert!(pending.iter().all(|a| a.channel_key == target));

    let channel = h.sim.ban_channel(op, &target).await.unwrap();
    assert!(channel.banned);

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert!(dashboard.pending_articles.iter().all(|a| a.channel_key != target));
    assert!(dashboard
        .pending_articles
        .iter()
        .any(|a| a.headline.contains("taken off air")));
    let free_wire = dashboard
        .channels
        .iter()
        .find(|c| c.key == "free_wire")
        .unwrap();
    assert_eq!(free_wire.credibility, 65);

    let err = h.sim.ban_channel(op, &target).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));
    let err = h.sim.ban_channel(op, "pirate_radio").await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { kind: "channel", .. }));

    let summary = h.sim.get_operator_impact_summary(op).await.unwrap();
    assert_eq!(summary.channels_banned, vec![target]);
    assert_eq!(summary.articles_suppressed, 4);
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

fn bookish_catalog() -> Catalog {
    let mut catalog = Catalog::builtin().unwrap();
    catalog.books.min_awareness_tier = 0;
    catalog
}

#[tokio::test]
async fn announced_book_can_be_banned_once() {
    let h = Harness::with_catalog(bookish_catalog(), directory(), EVERYTHING_FIRES);
    let op = h.start().await;

    let report = h.sim.tick(op).await.unwrap();
    assert_eq!(report.books_announced, 1);

    let pending = h.sim.get_dashboard(op).await.unwrap().pending_books;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "The Quiet Registry");

    let banned = h.sim.ban_book(op, pending[0].id).await.unwrap();
    assert_eq!(banned.status, BookStatus::Banned);
    let err = h.sim.ban_book(op, pending[0].id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.metrics.awareness, 4);
    assert_eq!(dashboard.metrics.anger, 6);

    let summary = h.sim.end_session(op).await.unwrap();
    assert_eq!(summary.books_banned, vec!["The Quiet Registry".to_string()]);
}

#[tokio::test]
async fn unbanned_book_is_published_on_following_tick() {
    let h = Harness::with_catalog(bookish_catalog(), directory(), EVERYTHING_FIRES);
    let op = h.start().await;

    h.sim.tick(op).await.unwrap();
    let book = h.sim.get_dashboard(op).await.unwrap().pending_books[0].clone();

    let report = h.sim.tick(op).await.unwrap();
    assert_eq!(report.books_published, 1);
    assert_eq!(report.books_announced, 0);

    let err = h.sim.ban_book(op, book.id).await.unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));
}

#[tokio::test]
async fn no_books_while_public_is_unaware() {
    let h = Harness::new(EVERYTHING_FIRES);
    let op = h.start().await;
    let report = h.sim.tick(op).await.unwrap();
    assert_eq!(report.books_announced, 0);
}
