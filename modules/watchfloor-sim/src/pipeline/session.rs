//! One operator session: state, its dispatch engine and its event log.

use std::sync::Arc;

use anyhow::Error;
use watchfloor_common::{SimError, SimResult};
use watchfloor_engine::{Engine, MemoryEventSink, StoredEvent};

use crate::pipeline::events::SimEvent;
use crate::pipeline::reducer::SessionReducer;
use crate::pipeline::router::SessionRouter;
use crate::pipeline::state::{SessionDeps, SessionState};

type SessionEngine =
    Engine<SimEvent, SessionState, SessionDeps, SessionReducer, SessionRouter, Arc<MemoryEventSink>>;

pub struct Session {
    pub state: SessionState,
    engine: SessionEngine,
    sink: Arc<MemoryEventSink>,
    deps: SessionDeps,
}

impl Session {
    pub fn new(state: SessionState, deps: SessionDeps) -> Self {
        let sink = Arc::new(MemoryEventSink::new());
        let engine = Engine::new(
            SessionReducer::new(deps.catalog.clone()),
            SessionRouter,
            sink.clone(),
            format!("operator:{}", state.operator_id),
        );
        Self {
            state,
            engine,
            sink,
            deps,
        }
    }

    /// Apply an event and everything it causes.
    pub async fn dispatch(&mut self, event: SimEvent) -> SimResult<Vec<SimEvent>> {
        self.engine
            .dispatch(event, &mut self.state, &self.deps)
            .await
            .map_err(into_sim_error)
    }

    /// The session's causal event log.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.sink.events()
    }

    pub fn event_count(&self) -> usize {
        self.sink.len()
    }

    pub fn stream(&self) -> &str {
        self.engine.stream()
    }
}

/// Handlers raise `SimError`s through anyhow; recover them for callers.
fn into_sim_error(err: Error) -> SimError {
    match err.downcast::<SimError>() {
        Ok(sim) => sim,
        Err(other) => SimError::Anyhow(other),
    }
}
