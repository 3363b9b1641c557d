//! The dispatch loop.

use std::collections::VecDeque;
use std::marker::PhantomData;

use anyhow::{bail, Result};
use tracing::debug;

use crate::traits::{EventLike, EventPersister, Reducer, Router};

/// Upper bound on events handled by one dispatch before it is aborted.
pub const DEFAULT_MAX_EVENTS: usize = 256;

/// Generic event dispatch engine.
///
/// Persist → reduce → route → enqueue, breadth-first, until settled.
/// Causal chaining is automatic: child events reference their trigger's seq.
pub struct Engine<E, S, D, Red, Rout, P>
where
    E: EventLike,
    S: Send,
    D: Send + Sync,
    Red: Reducer<E, S>,
    Rout: Router<E, S, D>,
    P: EventPersister,
{
    reducer: Red,
    router: Rout,
    persister: P,
    stream: String,
    max_events: usize,
    _phantom: PhantomData<fn() -> (E, S, D)>,
}

impl<E, S, D, Red, Rout, P> Engine<E, S, D, Red, Rout, P>
where
    E: EventLike,
    S: Send,
    D: Send + Sync,
    Red: Reducer<E, S>,
    Rout: Router<E, S, D>,
    P: EventPersister,
{
    pub fn new(reducer: Red, router: Rout, persister: P, stream: String) -> Self {
        Self {
            reducer,
            router,
            persister,
            stream,
            max_events: DEFAULT_MAX_EVENTS,
            _phantom: PhantomData,
        }
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Dispatch an event and everything it causes.
    ///
    /// Returns every handled event in handling order, the root first.
    /// A router error aborts the rest of the cascade; events already
    /// reduced stay applied.
    pub async fn dispatch(&self, event: E, state: &mut S, deps: &D) -> Result<Vec<E>> {
        let mut queue: VecDeque<(E, Option<i64>)> = VecDeque::new();
        queue.push_back((event, None));
        let mut handled = Vec::new();

        while let Some((evt, parent_seq)) = queue.pop_front() {
            if handled.len() >= self.max_events {
                bail!(
                    "event cascade on stream {} exceeded {} events",
                    self.stream,
                    self.max_events
                );
            }

            // 1. Persist with causal chain
            let stored = match parent_seq {
                None => {
                    self.persister
                        .persist(evt.event_type_str(), evt.to_persist_payload(), &self.stream)
                        .await?
                }
                Some(parent) => {
                    self.persister
                        .persist_child(
                            parent,
                            evt.event_type_str(),
                            evt.to_persist_payload(),
                            &self.stream,
                        )
                        .await?
                }
            };
            debug!(seq = stored.seq, event_type = %stored.event_type, "dispatched");

            // 2. Reduce
            self.reducer.reduce(state, &evt);

            // 3. Route
            let children = self.router.route(&evt, &stored, state, deps).await?;

            // 4. Enqueue children
            for child in children {
                queue.push_back((child, Some(stored.seq)));
            }
            handled.push(evt);
        }

        Ok(handled)
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }
}
