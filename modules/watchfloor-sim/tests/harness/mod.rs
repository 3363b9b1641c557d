//! Shared setup for the simulation integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use watchfloor_common::{Catalog, CitizenSnapshot, Domain};
use watchfloor_sim::testing::{
    epoch, high_risk_citizen, quiet_citizen, ManualClock, MockDirectory, ScriptedRandom,
};
use watchfloor_sim::{RandomSource, RngFactory, Simulation, SimulationDeps};

/// Every chance fails: nothing is detected, no agent is planted, forming
/// protests disperse, no random news or books.
pub const NOTHING_FIRES: f64 = 0.999;

/// Every chance succeeds and every pick takes the first option.
pub const EVERYTHING_FIRES: f64 = 0.0;

pub struct Harness {
    pub sim: Simulation,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(draw: f64) -> Self {
        Self::with_catalog(Catalog::builtin().unwrap(), directory(), draw)
    }

    pub fn with_catalog(catalog: Catalog, directory: MockDirectory, draw: f64) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let factory: RngFactory =
            Arc::new(move |_: Uuid| Box::new(ScriptedRandom::constant(draw)) as Box<dyn RandomSource>);
        let sim = Simulation::new(
            SimulationDeps::builder()
                .catalog(Arc::new(catalog))
                .directory(Arc::new(directory))
                .clock(clock.clone())
                .rng_factory(Some(factory))
                .build(),
        )
        .unwrap();
        Self { sim, clock }
    }

    /// Session randomness from a base seed instead of a scripted source.
    pub fn seeded(seed: u64) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let sim = Simulation::new(
            SimulationDeps::builder()
                .catalog(Arc::new(Catalog::builtin().unwrap()))
                .directory(Arc::new(directory()))
                .clock(clock.clone())
                .seed(Some(seed))
                .build(),
        )
        .unwrap();
        Self { sim, clock }
    }

    pub fn advance_hours(&self, hours: i64) {
        self.clock.advance(Duration::hours(hours));
    }

    pub async fn start(&self) -> Uuid {
        self.sim.start_session("OP-0042").await.unwrap().operator_id
    }
}

/// Built-in catalogue with every domain granted from week 1.
pub fn all_domains_catalog() -> Catalog {
    let mut catalog = Catalog::builtin().unwrap();
    for directive in catalog.directives.iter_mut().filter(|d| d.week == 1) {
        directive.required_domains = Domain::ALL.to_vec();
    }
    catalog
}

/// Clone of the high-risk fixture under a new identity.
pub fn organiser(n: u128, neighborhood: &str) -> CitizenSnapshot {
    let mut c = high_risk_citizen();
    c.citizen_id = Uuid::from_u128(0x1000 + n);
    c.name = format!("Organiser {n}");
    c.neighborhood = neighborhood.to_string();
    c
}

pub fn organisers() -> Vec<CitizenSnapshot> {
    (1..=6).map(|n| organiser(n, "Millrow")).collect()
}

/// The two fixtures plus six organisers, all matching the week-1 directive
/// except the quiet citizen.
pub fn directory() -> MockDirectory {
    let base = MockDirectory::new()
        .with(high_risk_citizen())
        .with(quiet_citizen());
    organisers().into_iter().fold(base, MockDirectory::with)
}
