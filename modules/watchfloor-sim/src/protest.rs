//! Protest state machine.
//!
//! FORMING → ACTIVE | DISPERSED; ACTIVE → VIOLENT | SUPPRESSED | DISPERSED.
//! Every non-FORMING, non-ACTIVE status is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::catalog::{NeighborhoodConfig, ProtestConfig};
use watchfloor_common::{ProtestStatus, SimError, SimResult};

use crate::random::RandomSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtestTrigger {
    Action { flag_id: Uuid },
    AngerTier { tier: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protest {
    pub id: Uuid,
    pub neighborhood: String,
    pub status: ProtestStatus,
    pub size: u32,
    pub trigger: ProtestTrigger,
    pub agent_present: bool,
    pub agent_discovered: bool,
    pub casualties: u32,
    pub arrests: u32,
    pub formed_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Protest {
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    /// An inciting agent is still shaping the crowd.
    fn agent_active(&self) -> bool {
        self.agent_present && !self.agent_discovered
    }

    pub fn check_investigable(&self) -> SimResult<()> {
        if !self.is_live() {
            return Err(SimError::Conflict(format!(
                "protest {} already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Whether an investigation would expose an agent now.
    pub fn agent_exposable(&self) -> bool {
        self.agent_active()
    }

    /// One-way. Returns false when there was nothing new to discover.
    pub fn discover_agent(&mut self) -> bool {
        if !self.agent_active() {
            return false;
        }
        self.agent_discovered = true;
        true
    }

    pub fn apply(&mut self, t: &ProtestTransition) {
        if !self.status.can_transition_to(t.to) {
            return;
        }
        self.status = t.to;
        self.size = t.size;
        self.arrests += t.arrests;
        self.casualties += t.casualties;
        if t.to.is_terminal() {
            self.resolved_at = Some(t.at);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtestTransition {
    pub protest_id: Uuid,
    pub neighborhood: String,
    pub from: ProtestStatus,
    pub to: ProtestStatus,
    pub size: u32,
    pub arrests: u32,
    pub casualties: u32,
    pub at: DateTime<Utc>,
}

pub struct ProtestSimulator<'a> {
    cfg: &'a ProtestConfig,
}

impl<'a> ProtestSimulator<'a> {
    pub fn new(cfg: &'a ProtestConfig) -> Self {
        Self { cfg }
    }

    /// A new FORMING protest, or `None` when the neighborhood is too small.
    pub fn form(
        &self,
        neighborhood: &NeighborhoodConfig,
        anger_tier: u8,
        trigger: ProtestTrigger,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Option<Protest> {
        if neighborhood.population < self.cfg.min_population {
            return None;
        }
        let turnout = self.cfg.turnout_per_tier * f64::from(anger_tier.max(1));
        let size = (f64::from(neighborhood.population) * turnout).round().max(1.0) as u32;

        Some(Protest {
            id: Uuid::new_v4(),
            neighborhood: neighborhood.name.clone(),
            status: ProtestStatus::Forming,
            size,
            trigger,
            agent_present: rng.chance(self.cfg.agent_presence_chance),
            agent_discovered: false,
            casualties: 0,
            arrests: 0,
            formed_at: now,
            resolved_at: None,
        })
    }

    /// One escalation draw. `None` when the protest stays as it is.
    pub fn step(
        &self,
        protest: &Protest,
        anger_tier: u8,
        unrest_propensity: f64,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Option<ProtestTransition> {
        let tier = f64::from(anger_tier);
        let agent = protest.agent_active();

        match protest.status {
            ProtestStatus::Forming => {
                let p = self.cfg.base_activation
                    + tier * self.cfg.activation_per_tier
                    + if agent { self.cfg.agent_activation_bonus } else { 0.0 }
                    + unrest_propensity;
                if rng.chance(p.clamp(0.0, 1.0)) {
                    let size = (f64::from(protest.size) * self.cfg.growth_factor).round() as u32;
                    Some(self.transition(protest, ProtestStatus::Active, size, 0, 0, now))
                } else {
                    Some(self.transition(protest, ProtestStatus::Dispersed, protest.size, 0, 0, now))
                }
            }
            ProtestStatus::Active => {
                let p_violent = (self.cfg.base_violence
                    + tier * self.cfg.violence_per_tier
                    + if agent { self.cfg.agent_violence_bonus } else { 0.0 })
                .clamp(0.0, 1.0);
                let p_suppressed = self.cfg.police_suppression;
                let p_dispersed =
                    (self.cfg.base_dispersal - tier * self.cfg.dispersal_per_tier).clamp(0.0, 1.0);

                let roll = rng.next_unit();
                if roll < p_violent {
                    let casualties = self.share(protest.size, self.cfg.casualty_share * 2.0);
                    let arrests = self.share(protest.size, self.cfg.arrest_share);
                    Some(self.transition(protest, ProtestStatus::Violent, protest.size, arrests, casualties, now))
                } else if roll < p_violent + p_suppressed {
                    Some(self.suppression(protest, now))
                } else if roll < p_violent + p_suppressed + p_dispersed {
                    Some(self.transition(protest, ProtestStatus::Dispersed, protest.size, 0, 0, now))
                } else {
                    None
                }
            }
            ProtestStatus::Dispersed | ProtestStatus::Violent | ProtestStatus::Suppressed => None,
        }
    }

    /// Operator-ordered crackdown. Only an ACTIVE protest can be suppressed.
    pub fn suppress(&self, protest: &Protest, now: DateTime<Utc>) -> SimResult<ProtestTransition> {
        match protest.status {
            ProtestStatus::Active => Ok(self.suppression(protest, now)),
            ProtestStatus::Forming => Err(SimError::Conflict(format!(
                "protest {} is still forming",
                protest.id
            ))),
            status => Err(SimError::Conflict(format!(
                "protest {} already {status}",
                protest.id
            ))),
        }
    }

    fn suppression(&self, protest: &Protest, now: DateTime<Utc>) -> ProtestTransition {
        let arrests = self.share(protest.size, self.cfg.arrest_share);
        let casualties = self.share(protest.size, self.cfg.casualty_share);
        self.transition(protest, ProtestStatus::Suppressed, protest.size, arrests, casualties, now)
    }

    fn share(&self, size: u32, fraction: f64) -> u32 {
        (f64::from(size) * fraction).round() as u32
    }

    fn transition(
        &self,
        protest: &Protest,
        to: ProtestStatus,
        size: u32,
        arrests: u32,
        casualties: u32,
        at: DateTime<Utc>,
    ) -> ProtestTransition {
        ProtestTransition {
            protest_id: protest.id,
            neighborhood: protest.neighborhood.clone(),
            from: protest.status,
            to,
            size,
            arrests,
            casualties,
            at,
        }
    }
}

/// Most populous neighborhood that is large enough and has no live protest.
pub fn pick_unrest_site<'n>(
    neighborhoods: &'n [NeighborhoodConfig],
    protests: &[Protest],
    min_population: u32,
) -> Option<&'n NeighborhoodConfig> {
    neighborhoods
        .iter()
        .filter(|n| n.population >= min_population)
        .filter(|n| {
            !protests
                .iter()
                .any(|p| p.is_live() && p.neighborhood.eq_ignore_ascii_case(&n.name))
        })
        .max_by(|a, b| a.population.cmp(&b.population).then_with(|| b.name.cmp(&a.name)))
}
