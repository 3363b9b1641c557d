//! The session aggregate and its event machinery.
//!
//! Operator commands become root `SimEvent`s; the reducer applies them to
//! `SessionState` and the router emits the world's reaction as child events.

pub mod events;
pub(crate) mod handlers;
pub mod reducer;
pub mod router;
pub mod session;
pub mod state;

pub use events::{MetricSource, SimEvent};
pub use session::Session;
pub use state::{FlagRecord, NoActionRecord, SessionDeps, SessionState};
