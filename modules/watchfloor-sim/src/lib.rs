//! Watchfloor simulation engine.
//!
//! An operator works through weekly directives, assessing and flagging
//! citizens; the world answers with consequences, public backlash, protests
//! and press coverage, while the operator's own compliance is watched.

pub mod books;
pub mod correlation;
pub mod directive;
pub mod metrics;
pub mod news;
pub mod outcomes;
pub mod pipeline;
pub mod protest;
pub mod random;
pub mod reluctance;
pub mod risk;
pub mod simulation;
pub mod traits;
pub mod views;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use random::{RandomSource, SeededRandom};
pub use simulation::{RngFactory, Simulation, SimulationDeps};
pub use traits::{CitizenDirectory, Clock, StaticDirectory, SystemClock};
