//! SessionRouter: routes session events to handlers.

use anyhow::Result;
use async_trait::async_trait;
use watchfloor_engine::{Router, StoredEvent};

use crate::pipeline::events::SimEvent;
use crate::pipeline::handlers;
use crate::pipeline::state::{SessionDeps, SessionState};

pub struct SessionRouter;

#[async_trait]
impl Router<SimEvent, SessionState, SessionDeps> for SessionRouter {
    async fn route(
        &self,
        event: &SimEvent,
        stored: &StoredEvent,
        state: &mut SessionState,
        deps: &SessionDeps,
    ) -> Result<Vec<SimEvent>> {
        handlers::route_session(event, stored, state, deps).await
    }
}
