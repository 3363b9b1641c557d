// Test doubles for the simulation.
//
// Three doubles matching the collaborator boundaries:
// - MockDirectory (CitizenDirectory): HashMap-based citizen_id to snapshot
// - ScriptedRandom (RandomSource): queued draws with a constant fallback
// - ManualClock (Clock): wall time that only moves when told to
//
// Plus fixture citizens with known scores against the built-in catalogue.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use watchfloor_common::snapshot::{
    Donation, FinanceRecord, HealthRecord, JudicialRecord, LocationRecord, LocationVisit,
    SocialRecord,
};
use watchfloor_common::CitizenSnapshot;

use crate::random::RandomSource;
use crate::traits::{CitizenDirectory, Clock};

// ---------------------------------------------------------------------------
// Fixture citizens
// ---------------------------------------------------------------------------

/// Scores 85 with every domain enabled and 25 with only judicial + location.
/// Has two dependents, lives in Eastgate.
pub fn high_risk_citizen() -> CitizenSnapshot {
    CitizenSnapshot {
        citizen_id: Uuid::from_u128(0x0001),
        name: "Mara Kessler".to_string(),
        age: 38,
        neighborhood: "Eastgate".to_string(),
        occupation: "Warehouse picker".to_string(),
        dependents: 2,
        health: Some(HealthRecord {
            conditions: vec!["chronic back pain".to_string()],
            mental_health_flags: vec!["depression".to_string()],
            prescriptions: vec!["sertraline".to_string()],
            substance_treatment: true,
            visits_last_year: 4,
            therapy_sessions: 6,
        }),
        finance: Some(FinanceRecord {
            income: 18000.0,
            debt: 26000.0,
            credit_score: 540,
            employment_status: "part-time".to_string(),
            unusual_transactions: 1,
            large_cash_withdrawals: 0,
            donations: vec![Donation {
                recipient: "Workers Solidarity Fund".to_string(),
                amount: 40.0,
            }],
        }),
        judicial: Some(JudicialRecord {
            prior_arrests: 1,
            protest_arrests: 1,
            ..Default::default()
        }),
        location: Some(LocationRecord {
            visits: vec![
                LocationVisit {
                    place: "Dock Street Union Hall".to_string(),
                    category: "union hall".to_string(),
                    count: 6,
                },
                LocationVisit {
                    place: "Eastgate Community Clinic".to_string(),
                    category: "clinic".to_string(),
                    count: 3,
                },
            ],
            curfew_violations: 0,
            trips_abroad: 0,
            night_activity_ratio: 0.2,
        }),
        social: Some(SocialRecord {
            posts: vec![
                "Join the strike on Friday".to_string(),
                "Know your rights".to_string(),
            ],
            group_memberships: vec!["Tenants Association".to_string()],
            flagged_associations: 1,
            encrypted_messaging: false,
            followers: 212,
        }),
    }
}

/// Matches no risk factor and no correlation rule.
pub fn quiet_citizen() -> CitizenSnapshot {
    CitizenSnapshot {
        citizen_id: Uuid::from_u128(0x0002),
        name: "Tomas Reyl".to_string(),
        age: 52,
        neighborhood: "Crown Heights".to_string(),
        occupation: "Accountant".to_string(),
        dependents: 0,
        health: Some(HealthRecord {
            visits_last_year: 1,
            ..Default::default()
        }),
        finance: Some(FinanceRecord {
            income: 64000.0,
            debt: 3000.0,
            credit_score: 780,
            employment_status: "employed".to_string(),
            ..Default::default()
        }),
        judicial: Some(JudicialRecord::default()),
        location: Some(LocationRecord {
            visits: vec![LocationVisit {
                place: "Crown Heights Grocer".to_string(),
                category: "grocery".to_string(),
                count: 20,
            }],
            night_activity_ratio: 0.05,
            ..Default::default()
        }),
        social: Some(SocialRecord {
            posts: vec!["Lovely weather for the regatta".to_string()],
            followers: 40,
            ..Default::default()
        }),
    }
}

/// Fixed start instant so timelines are reproducible.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 3, 2, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// ---------------------------------------------------------------------------
// MockDirectory
// ---------------------------------------------------------------------------

/// HashMap-based directory. Builder pattern: `.with()`, `.failing()`.
pub struct MockDirectory {
    citizens: HashMap<Uuid, CitizenSnapshot>,
    order: Vec<Uuid>,
    fail: bool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            citizens: HashMap::new(),
            order: Vec::new(),
            fail: false,
        }
    }

    pub fn with(mut self, citizen: CitizenSnapshot) -> Self {
        if !self.citizens.contains_key(&citizen.citizen_id) {
            self.order.push(citizen.citizen_id);
        }
        self.citizens.insert(citizen.citizen_id, citizen);
        self
    }

    /// Every lookup returns `Err`, as an unreachable upstream would.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CitizenDirectory for MockDirectory {
    async fn snapshot(&self, citizen_id: Uuid) -> Result<Option<CitizenSnapshot>> {
        if self.fail {
            bail!("citizen directory unavailable");
        }
        Ok(self.citizens.get(&citizen_id).cloned())
    }

    async fn citizens(&self) -> Result<Vec<CitizenSnapshot>> {
        if self.fail {
            bail!("citizen directory unavailable");
        }
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.citizens.get(id).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedRandom
// ---------------------------------------------------------------------------

/// Returns queued draws in order, then `fallback` forever.
pub struct ScriptedRandom {
    queue: VecDeque<f64>,
    fallback: f64,
    draws: usize,
}

impl ScriptedRandom {
    pub fn constant(value: f64) -> Self {
        Self::scripted(Vec::new(), value)
    }

    pub fn scripted(draws: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            queue: draws.into_iter().collect(),
            fallback,
            draws: 0,
        }
    }

    /// Number of values handed out so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
