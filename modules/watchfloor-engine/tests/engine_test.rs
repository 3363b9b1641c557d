//! Integration tests for the Engine dispatch loop, backed by MemoryEventSink.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use watchfloor_engine::{Engine, EventLike, MemoryEventSink, Reducer, Router, StoredEvent};

// ---------------------------------------------------------------------------
// Test event type: a gauge that announces when it crosses multiples of ten
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GaugeEvent {
    Raised { by: u32 },
    Crossed { mark: u32 },
    Reported { mark: u32 },
}

impl EventLike for GaugeEvent {
    fn event_type_str(&self) -> String {
        match self {
            GaugeEvent::Raised { .. } => "raised".into(),
            GaugeEvent::Crossed { .. } => "crossed".into(),
            GaugeEvent::Reported { .. } => "reported".into(),
        }
    }

    fn to_persist_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("GaugeEvent serialization should never fail")
    }
}

#[derive(Debug, Default)]
struct GaugeState {
    level: u32,
    pending_marks: Vec<u32>,
    reports: Vec<u32>,
    seen: Vec<String>,
}

struct GaugeReducer;

impl Reducer<GaugeEvent, GaugeState> for GaugeReducer {
    fn reduce(&self, state: &mut GaugeState, event: &GaugeEvent) {
        state.seen.push(event.event_type_str());
        match event {
            GaugeEvent::Raised { by } => {
                let before = state.level / 10;
                state.level += by;
                let after = state.level / 10;
                state
                    .pending_marks
                    .extend((before + 1..=after).map(|m| m * 10));
            }
            GaugeEvent::Crossed { .. } => {}
            GaugeEvent::Reported { mark } => state.reports.push(*mark),
        }
    }
}

/// Drains stashed crossings; each crossing gets one report.
struct GaugeRouter;

#[async_trait]
impl Router<GaugeEvent, GaugeState, ()> for GaugeRouter {
    async fn route(
        &self,
        event: &GaugeEvent,
        _stored: &StoredEvent,
        state: &mut GaugeState,
        _deps: &(),
    ) -> Result<Vec<GaugeEvent>> {
        match event {
            GaugeEvent::Raised { .. } => Ok(state
                .pending_marks
                .drain(..)
                .map(|mark| GaugeEvent::Crossed { mark })
                .collect()),
            GaugeEvent::Crossed { mark } => Ok(vec![GaugeEvent::Reported { mark: *mark }]),
            GaugeEvent::Reported { .. } => Ok(vec![]),
        }
    }
}

/// Every event raises the gauge again, forever.
struct RunawayRouter;

#[async_trait]
impl Router<GaugeEvent, GaugeState, ()> for RunawayRouter {
    async fn route(
        &self,
        _event: &GaugeEvent,
        _stored: &StoredEvent,
        _state: &mut GaugeState,
        _deps: &(),
    ) -> Result<Vec<GaugeEvent>> {
        Ok(vec![GaugeEvent::Raised { by: 1 }])
    }
}

struct FailingRouter;

#[async_trait]
impl Router<GaugeEvent, GaugeState, ()> for FailingRouter {
    async fn route(
        &self,
        event: &GaugeEvent,
        _stored: &StoredEvent,
        _state: &mut GaugeState,
        _deps: &(),
    ) -> Result<Vec<GaugeEvent>> {
        match event {
            GaugeEvent::Raised { .. } => Ok(vec![GaugeEvent::Crossed { mark: 0 }]),
            _ => bail!("router refused"),
        }
    }
}

fn engine<R: Router<GaugeEvent, GaugeState, ()>>(
    router: R,
) -> (
    Engine<GaugeEvent, GaugeState, (), GaugeReducer, R, Arc<MemoryEventSink>>,
    Arc<MemoryEventSink>,
) {
    let sink = Arc::new(MemoryEventSink::new());
    let engine = Engine::new(GaugeReducer, router, sink.clone(), "gauge".into());
    (engine, sink)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn quiet_event_persists_once() {
    let (engine, sink) = engine(GaugeRouter);
    let mut state = GaugeState::default();

    let handled = engine
        .dispatch(GaugeEvent::Raised { by: 3 }, &mut state, &())
        .await
        .unwrap();

    assert_eq!(handled.len(), 1);
    assert_eq!(state.level, 3);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "raised");
    assert!(events[0].is_root());
    assert_eq!(events[0].stream, "gauge");
}

#[tokio::test]
async fn stashed_crossings_become_causal_children() {
    let (engine, sink) = engine(GaugeRouter);
    let mut state = GaugeState::default();

    engine
        .dispatch(GaugeEvent::Raised { by: 25 }, &mut state, &())
        .await
        .unwrap();

    assert_eq!(state.reports, vec![10, 20]);
    assert!(state.pending_marks.is_empty());

    let events = sink.events();
    let root = &events[0];
    let crossings = sink.of_type("crossed");
    assert_eq!(crossings.len(), 2);
    assert!(crossings.iter().all(|c| c.caused_by_seq == Some(root.seq)));

    let reports = sink.of_type("reported");
    assert_eq!(reports[0].caused_by_seq, Some(crossings[0].seq));
    assert_eq!(reports[1].caused_by_seq, Some(crossings[1].seq));
}

#[tokio::test]
async fn dispatch_is_breadth_first() {
    let (engine, _sink) = engine(GaugeRouter);
    let mut state = GaugeState::default();

    engine
        .dispatch(GaugeEvent::Raised { by: 20 }, &mut state, &())
        .await
        .unwrap();

    assert_eq!(
        state.seen,
        vec!["raised", "crossed", "crossed", "reported", "reported"]
    );
}

#[tokio::test]
async fn runaway_cascade_is_cut_off() {
    let sink = Arc::new(MemoryEventSink::new());
    let engine = Engine::new(GaugeReducer, RunawayRouter, sink.clone(), "runaway".into())
        .with_max_events(16);
    let mut state = GaugeState::default();

    let result = engine
        .dispatch(GaugeEvent::Raised { by: 1 }, &mut state, &())
        .await;

    assert!(result.is_err());
    assert_eq!(sink.len(), 16);
}

#[tokio::test]
async fn router_error_stops_cascade_but_keeps_reduced_state() {
    let (engine, sink) = engine(FailingRouter);
    let mut state = GaugeState::default();

    let result = engine
        .dispatch(GaugeEvent::Raised { by: 4 }, &mut state, &())
        .await;

    assert!(result.is_err());
    assert_eq!(state.level, 4);
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn sequence_numbers_increase_across_dispatches() {
    let (engine, sink) = engine(GaugeRouter);
    let mut state = GaugeState::default();

    for _ in 0..3 {
        engine
            .dispatch(GaugeEvent::Raised { by: 1 }, &mut state, &())
            .await
            .unwrap();
    }

    let seqs: Vec<i64> = sink.events().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert!(sink.events().iter().all(StoredEvent::is_root));
}
