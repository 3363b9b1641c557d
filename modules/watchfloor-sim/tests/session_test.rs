//! Operator session lifecycle: assessment, decisions, deadlines and
//! directive progression, driven through the public `Simulation` API.
//!
//! Run with: cargo test -p watchfloor-sim --test session_test

mod harness;

use chrono::Duration;
use uuid::Uuid;

use watchfloor_common::{Domain, FlagType, OperatorStatus, RiskLevel, SimError, TimeSkip, Urgency};
use watchfloor_sim::testing::{high_risk_citizen, quiet_citizen, MockDirectory};

use harness::{all_domains_catalog, directory, organiser, organisers, Harness, NOTHING_FIRES};

// ---------------------------------------------------------------------------
// Session start and assessment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_session_starts_active_on_week_one() {
    let h = Harness::new(NOTHING_FIRES);
    let dashboard = h.sim.start_session("OP-0042").await.unwrap();

    assert_eq!(dashboard.status, OperatorStatus::Active);
    assert_eq!(dashboard.operator_code, "OP-0042");
    assert_eq!(dashboard.directive.key, "baseline_sweep");
    assert_eq!(dashboard.directive.week, 1);
    assert_eq!(dashboard.directive.flag_quota, 5);
    assert_eq!(dashboard.enabled_domains, vec![Domain::Judicial, Domain::Location]);
    assert_eq!(dashboard.compliance_score, 100.0);
    assert_eq!(dashboard.review_queue.len(), 8);

    let quiet = dashboard
        .review_queue
        .iter()
        .find(|q| q.citizen_id == quiet_citizen().citizen_id)
        .unwrap();
    assert!(!quiet.matches_directive);
    let target = dashboard
        .review_queue
        .iter()
        .find(|q| q.citizen_id == high_risk_citizen().citizen_id)
        .unwrap();
    assert!(target.matches_directive);
    assert!(!target.already_flagged);
}

#[tokio::test]
async fn assessment_only_sees_enabled_domains() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    let assessment = h
        .sim
        .assess_risk(op, high_risk_citizen().citizen_id)
        .await
        .unwrap();

    assert_eq!(assessment.score, 25);
    assert!(assessment
        .factors
        .iter()
        .all(|f| matches!(f.domain, Domain::Judicial | Domain::Location)));
    assert!(assessment
        .unlockable
        .iter()
        .any(|hint| hint.domain == Domain::Social));
}

#[tokio::test]
async fn unknown_citizen_and_operator_are_not_found() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    let err = h.sim.assess_risk(op, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { kind: "citizen", .. }));

    let err = h.sim.get_dashboard(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { kind: "operator", .. }));
}

#[tokio::test]
async fn directory_outage_surfaces_as_error() {
    let h = Harness::with_catalog(
        watchfloor_common::Catalog::builtin().unwrap(),
        MockDirectory::new().failing(),
        NOTHING_FIRES,
    );
    let err = h.sim.start_session("OP-0042").await.unwrap_err();
    assert!(matches!(err, SimError::Anyhow(_)));
}

// ---------------------------------------------------------------------------
// Flags and consequences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detention_produces_five_stage_timeline_starting_immediately() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let citizen = high_risk_citizen();

    let result = h
        .sim
        .submit_flag(op, citizen.citizen_id, FlagType::Detention, "Organised the dock strike")
        .await
        .unwrap();

    assert_eq!(result.risk_score, 25);
    assert!(!result.detected);
    let immediate = result.immediate_outcome.unwrap();
    assert_eq!(immediate.skip, TimeSkip::Immediate);
    assert!(immediate.narrative.contains("Organised the dock strike"));
    assert!(immediate.statistics.contains_key("children_placed_in_care"));

    let timeline = h.sim.get_outcome_timeline(result.flag_id).await.unwrap();
    assert_eq!(timeline.entries.len(), 5);
    assert_eq!(timeline.entries[0].skip, TimeSkip::Immediate);
    assert_eq!(timeline.citizen_name, "Mara Kessler");
    assert_eq!(timeline.justification, "Organised the dock strike");
}

#[tokio::test]
async fn severe_citizen_with_full_access_gets_immediate_detention() {
    let h = Harness::with_catalog(all_domains_catalog(), directory(), NOTHING_FIRES);
    let op = h.start().await;
    let citizen = high_risk_citizen();

    let assessment = h.sim.assess_risk(op, citizen.citizen_id).await.unwrap();
    assert_eq!(assessment.enabled_domains, Domain::ALL.to_vec());
    assert_eq!(assessment.score, 85);
    assert_eq!(assessment.level, RiskLevel::Severe);
    assert!(assessment.unlockable.is_empty());
    let recommended = &assessment.recommended_actions[0];
    assert_eq!(recommended.urgency, Urgency::Immediate);
    assert_eq!(recommended.action, FlagType::Detention);

    let result = h
        .sim
        .submit_flag(op, citizen.citizen_id, recommended.action, &recommended.rationale)
        .await
        .unwrap();
    assert_eq!(result.risk_score, 85);
    assert_eq!(result.risk_level, RiskLevel::Severe);

    let timeline = h.sim.get_outcome_timeline(result.flag_id).await.unwrap();
    assert_eq!(timeline.risk_score, 85);
    assert_eq!(timeline.entries.len(), 5);
    assert_eq!(timeline.entries[0].skip, TimeSkip::Immediate);
}

#[tokio::test]
async fn outcome_timeline_is_stable_across_reads() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let flag = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Restriction, "Debt risk")
        .await
        .unwrap();

    let first = h.sim.get_outcome_timeline(flag.flag_id).await.unwrap();
    h.sim.tick(op).await.unwrap();
    let second = h.sim.get_outcome_timeline(flag.flag_id).await.unwrap();

    assert_eq!(
        serde_json::to_value(&first.entries).unwrap(),
        serde_json::to_value(&second.entries).unwrap()
    );
}

#[tokio::test]
async fn same_flag_twice_is_a_conflict_but_other_types_are_not() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let id = high_risk_citizen().citizen_id;

    h.sim
        .submit_flag(op, id, FlagType::Monitoring, "first")
        .await
        .unwrap();
    let err = h
        .sim
        .submit_flag(op, id, FlagType::Monitoring, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    h.sim
        .submit_flag(op, id, FlagType::Restriction, "escalate")
        .await
        .unwrap();
    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.flags_submitted, 2);
    assert_eq!(dashboard.directive.flags_this_period, 2);
}

#[tokio::test]
async fn unknown_flag_has_no_timeline() {
    let h = Harness::new(NOTHING_FIRES);
    h.start().await;
    let err = h.sim.get_outcome_timeline(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { kind: "flag", .. }));
}

// ---------------------------------------------------------------------------
// Reluctance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_decision_after_assessment_counts_as_hesitation() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let quiet = quiet_citizen().citizen_id;

    h.sim.assess_risk(op, quiet).await.unwrap();
    h.clock.advance(Duration::seconds(120));
    let slow = h
        .sim
        .submit_no_action(op, quiet, "nothing on file")
        .await
        .unwrap();
    assert!(slow.hesitated);
    assert_eq!(slow.reluctance.hesitation_count, 1);
    assert_eq!(slow.reluctance.no_action_count, 1);

    let unassessed = h
        .sim
        .submit_no_action(op, organiser(1, "Millrow").citizen_id, "not convinced")
        .await
        .unwrap();
    assert!(!unassessed.hesitated);
    assert_eq!(unassessed.compliance_score, 96.0);
}

#[tokio::test]
async fn missed_quota_puts_operator_under_review_then_terminates() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    h.advance_hours(73);
    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.status, OperatorStatus::UnderReview);
    assert!(dashboard.reluctance.under_review);
    assert_eq!(dashboard.reluctance.missed_deadlines, 1);
    assert_eq!(dashboard.reluctance.quota_shortfall, 5);
    assert_eq!(dashboard.compliance_score, 80.0);

    let types: Vec<String> = h
        .sim
        .events(op)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&"deadline_missed".to_string()));
    assert!(types.contains(&"operator_status_changed".to_string()));

    // A second read in the same period does not count the miss again.
    let again = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(again.reluctance.missed_deadlines, 1);

    h.advance_hours(73);
    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.status, OperatorStatus::Terminated);

    let err = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Monitoring, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState(_)));
    let err = h
        .sim
        .assess_risk(op, high_risk_citizen().citizen_id)
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState(_)));
    let err = h
        .sim
        .submit_no_action(op, quiet_citizen().citizen_id, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState(_)));
    let err = h.sim.ban_channel(op, "free_wire").await.unwrap_err();
    assert!(matches!(err, SimError::InvalidState(_)));

    // Termination is absorbing: the refusal does not change on retry.
    let err = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Monitoring, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidState(_)));

    // The world keeps moving without the operator.
    let report = h.sim.tick(op).await.unwrap();
    assert_eq!(report.operator_status, OperatorStatus::Terminated);
    assert!(!report.deadline_missed);
}

#[tokio::test]
async fn decisions_after_the_final_directive_are_conflicts() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let mut citizens = vec![high_risk_citizen(), quiet_citizen()];
    citizens.extend(organisers());

    let mut flags = 0;
    let mut complete = false;
    'campaign: for flag_type in FlagType::ALL {
        for citizen in &citizens {
            let result = h
                .sim
                .submit_flag(op, citizen.citizen_id, flag_type, "sweep")
                .await
                .unwrap();
            flags += 1;
            if result.campaign_complete {
                complete = true;
                break 'campaign;
            }
        }
    }
    assert!(complete);
    assert_eq!(flags, 24);

    let err = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));
    let err = h
        .sim
        .submit_no_action(op, quiet_citizen().citizen_id, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::Conflict(_)));

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert!(dashboard.campaign_complete);
    assert_eq!(dashboard.status, OperatorStatus::Active);
}

#[tokio::test]
async fn concurrent_decisions_on_one_operator_are_all_counted() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    let ids: Vec<Uuid> = organisers().iter().take(4).map(|c| c.citizen_id).collect();

    let (f1, f2, f3, f4, n1, n2) = tokio::join!(
        h.sim.submit_flag(op, ids[0], FlagType::Monitoring, "sweep"),
        h.sim.submit_flag(op, ids[1], FlagType::Monitoring, "sweep"),
        h.sim.submit_flag(op, ids[2], FlagType::Monitoring, "sweep"),
        h.sim.submit_flag(op, ids[3], FlagType::Monitoring, "sweep"),
        h.sim.submit_no_action(op, high_risk_citizen().citizen_id, "unclear"),
        h.sim.submit_no_action(op, quiet_citizen().citizen_id, "unclear"),
    );
    for result in [f1, f2, f3, f4] {
        result.unwrap();
    }
    n1.unwrap();
    n2.unwrap();

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.flags_submitted, 4);
    assert_eq!(dashboard.reviews_completed, 6);
    assert_eq!(dashboard.directive.flags_this_period, 4);
    assert_eq!(dashboard.reluctance.actions_taken, 4);
    assert_eq!(dashboard.reluctance.no_action_count, 2);
    assert_eq!(dashboard.compliance_score, 96.0);
    assert_eq!(dashboard.status, OperatorStatus::Active);

    let events = h.sim.events(op).await.unwrap();
    let count = |t: &str| events.iter().filter(|e| e.event_type == t).count();
    assert_eq!(count("flag_submitted"), 4);
    assert_eq!(count("no_action_submitted"), 2);
}

#[tokio::test]
async fn operator_under_review_may_still_flag_and_is_cleared_by_meeting_quota() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    h.advance_hours(73);
    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.status, OperatorStatus::UnderReview);

    let mut results = Vec::new();
    for citizen in organisers().into_iter().take(5) {
        results.push(
            h.sim
                .submit_flag(op, citizen.citizen_id, FlagType::Monitoring, "sweep")
                .await
                .unwrap(),
        );
    }
    // Review is a probation: flags are accepted until the quota is met.
    assert_eq!(results[0].operator_status, OperatorStatus::UnderReview);
    assert_eq!(results[3].operator_status, OperatorStatus::UnderReview);
    assert_eq!(results[4].operator_status, OperatorStatus::Active);
}

// ---------------------------------------------------------------------------
// Directive progression
// ---------------------------------------------------------------------------

#[tokio::test]
async fn meeting_quota_advances_to_next_directive_and_widens_access() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    let mut results = Vec::new();
    for citizen in organisers().into_iter().take(5) {
        results.push(
            h.sim
                .submit_flag(op, citizen.citizen_id, FlagType::Monitoring, "sweep")
                .await
                .unwrap(),
        );
    }
    assert_eq!(results[3].directive_key, "baseline_sweep");
    assert_eq!(results[4].directive_key, "financial_irregularities");

    let dashboard = h.sim.get_dashboard(op).await.unwrap();
    assert_eq!(dashboard.directive.week, 2);
    assert_eq!(dashboard.directive.flags_this_period, 0);
    assert_eq!(dashboard.directive.flag_quota, 4);
    assert_eq!(
        dashboard.enabled_domains,
        vec![Domain::Finance, Domain::Judicial, Domain::Location]
    );

    let summary = h.sim.get_operator_impact_summary(op).await.unwrap();
    assert_eq!(summary.directives_completed, vec!["baseline_sweep".to_string()]);
    assert_eq!(summary.weeks_served, 2);

    // The wider view raises the score of a citizen already on file.
    let assessment = h.sim.assess_risk(op, high_risk_citizen().citizen_id).await.unwrap();
    assert_eq!(assessment.score, 50);
}

#[tokio::test]
async fn low_compliance_routes_to_remedial_review() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    // One missed deadline (-20) and nine refusals (-18) leave 62.
    h.advance_hours(73);
    h.sim.get_dashboard(op).await.unwrap();
    let quiet = quiet_citizen().citizen_id;
    for _ in 0..9 {
        h.sim.submit_no_action(op, quiet, "no grounds").await.unwrap();
    }

    let mut last = None;
    for citizen in organisers().into_iter().take(5) {
        last = Some(
            h.sim
                .submit_flag(op, citizen.citizen_id, FlagType::Monitoring, "sweep")
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.directive_key, "remedial_review");
    assert_eq!(last.compliance_score, 67.0);
}

// ---------------------------------------------------------------------------
// Isolation and teardown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn operators_do_not_share_state() {
    let h = Harness::new(NOTHING_FIRES);
    let a = h.start().await;
    let b = h.start().await;
    let id = high_risk_citizen().citizen_id;

    let (ra, rb) = tokio::join!(
        h.sim.submit_flag(a, id, FlagType::Monitoring, "a"),
        h.sim.submit_flag(b, id, FlagType::Monitoring, "b"),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_ne!(ra.flag_id, rb.flag_id);

    let timeline = h.sim.get_outcome_timeline(rb.flag_id).await.unwrap();
    assert_eq!(timeline.justification, "b");

    h.sim.submit_no_action(a, quiet_citizen().citizen_id, "none").await.unwrap();
    let summary_b = h.sim.get_operator_impact_summary(b).await.unwrap();
    assert_eq!(summary_b.no_actions, 0);
}

#[tokio::test]
async fn ending_a_session_returns_summary_and_forgets_it() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;

    let flag = h
        .sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();
    h.sim
        .submit_no_action(op, quiet_citizen().citizen_id, "clean record")
        .await
        .unwrap();

    let summary = h.sim.end_session(op).await.unwrap();
    assert_eq!(summary.flags_by_type.get(&FlagType::Detention), Some(&1));
    assert_eq!(summary.citizens_flagged, 1);
    assert_eq!(summary.families_affected, 2);
    assert_eq!(summary.no_actions, 1);
    assert_eq!(summary.detections, 0);
    assert!(summary.event_count > 0);

    let err = h.sim.get_dashboard(op).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
    let err = h.sim.get_outcome_timeline(flag.flag_id).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
    let err = h.sim.end_session(op).await.unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
}

#[tokio::test]
async fn event_log_records_causal_chain() {
    let h = Harness::new(NOTHING_FIRES);
    let op = h.start().await;
    h.sim
        .submit_flag(op, high_risk_citizen().citizen_id, FlagType::Detention, "organiser")
        .await
        .unwrap();

    let events = h.sim.events(op).await.unwrap();
    assert_eq!(events[0].event_type, "session_started");
    assert!(events[0].is_root());
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));

    let flag = events
        .iter()
        .find(|e| e.event_type == "flag_submitted")
        .unwrap();
    assert!(flag.is_root());
    let children: Vec<&str> = events
        .iter()
        .filter(|e| e.caused_by_seq == Some(flag.seq))
        .map(|e| e.event_type.as_str())
        .collect();
    assert!(children.contains(&"metrics_shifted"));
    assert!(children.contains(&"article_drafted"));
    assert!(children.contains(&"protest_formed"));
}
