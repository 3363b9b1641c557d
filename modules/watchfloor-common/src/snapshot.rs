//! Cross-domain citizen records as supplied by the upstream population source.
//!
//! The engine only ever reads these. Every domain record is optional: an absent
//! record means "no data" (or "not yet enabled"), never an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Domain;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenSnapshot {
    pub citizen_id: Uuid,
    pub name: String,
    pub age: u32,
    pub neighborhood: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub dependents: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance: Option<FinanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judicial: Option<JudicialRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthRecord {
    pub conditions: Vec<String>,
    pub mental_health_flags: Vec<String>,
    pub prescriptions: Vec<String>,
    pub substance_treatment: bool,
    pub visits_last_year: u32,
    pub therapy_sessions: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceRecord {
    pub income: f64,
    pub debt: f64,
    pub credit_score: u32,
    pub employment_status: String,
    pub unusual_transactions: u32,
    pub large_cash_withdrawals: u32,
    pub donations: Vec<Donation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Donation {
    pub recipient: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JudicialRecord {
    pub prior_arrests: u32,
    pub convictions: u32,
    pub pending_cases: u32,
    pub protest_arrests: u32,
    pub civil_disputes: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    pub visits: Vec<LocationVisit>,
    pub curfew_violations: u32,
    pub trips_abroad: u32,
    /// Share of tracked movement between 22:00 and 05:00 (0.0-1.0).
    pub night_activity_ratio: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationVisit {
    pub place: String,
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialRecord {
    pub posts: Vec<String>,
    pub group_memberships: Vec<String>,
    pub flagged_associations: u32,
    pub encrypted_messaging: bool,
    pub followers: u32,
}

// --- Named fields ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Number,
    Flag,
    Text,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    /// Human-readable rendering used in evidence strings and narratives.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            FieldValue::Number(n) => format!("{n:.2}"),
            FieldValue::Flag(true) => "yes".to_string(),
            FieldValue::Flag(false) => "no".to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) if items.is_empty() => "none".to_string(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

/// A field that predicates and templates may reference.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// `None` for identity fields that are always visible.
    pub domain: Option<Domain>,
}

const fn spec(name: &'static str, kind: FieldKind, domain: Option<Domain>) -> FieldSpec {
    FieldSpec { name, kind, domain }
}

pub const SNAPSHOT_FIELDS: &[FieldSpec] = &[
    spec("citizen.name", FieldKind::Text, None),
    spec("citizen.age", FieldKind::Number, None),
    spec("citizen.neighborhood", FieldKind::Text, None),
    spec("citizen.occupation", FieldKind::Text, None),
    spec("citizen.dependents", FieldKind::Number, None),
    spec("health.conditions", FieldKind::List, Some(Domain::Health)),
    spec("health.mental_health_flags", FieldKind::List, Some(Domain::Health)),
    spec("health.prescriptions", FieldKind::List, Some(Domain::Health)),
    spec("health.substance_treatment", FieldKind::Flag, Some(Domain::Health)),
    spec("health.visits_last_year", FieldKind::Number, Some(Domain::Health)),
    spec("health.therapy_sessions", FieldKind::Number, Some(Domain::Health)),
    spec("finance.income", FieldKind::Number, Some(Domain::Finance)),
    spec("finance.debt", FieldKind::Number, Some(Domain::Finance)),
    spec("finance.credit_score", FieldKind::Number, Some(Domain::Finance)),
    spec("finance.employment_status", FieldKind::Text, Some(Domain::Finance)),
    spec("finance.unusual_transactions", FieldKind::Number, Some(Domain::Finance)),
    spec("finance.large_cash_withdrawals", FieldKind::Number, Some(Domain::Finance)),
    spec("finance.donation_recipients", FieldKind::List, Some(Domain::Finance)),
    spec("finance.donation_total", FieldKind::Number, Some(Domain::Finance)),
    spec("judicial.prior_arrests", FieldKind::Number, Some(Domain::Judicial)),
    spec("judicial.convictions", FieldKind::Number, Some(Domain::Judicial)),
    spec("judicial.pending_cases", FieldKind::Number, Some(Domain::Judicial)),
    spec("judicial.protest_arrests", FieldKind::Number, Some(Domain::Judicial)),
    spec("judicial.civil_disputes", FieldKind::Number, Some(Domain::Judicial)),
    spec("location.visited_places", FieldKind::List, Some(Domain::Location)),
    spec("location.visited_categories", FieldKind::List, Some(Domain::Location)),
    spec("location.curfew_violations", FieldKind::Number, Some(Domain::Location)),
    spec("location.trips_abroad", FieldKind::Number, Some(Domain::Location)),
    spec("location.night_activity_ratio", FieldKind::Number, Some(Domain::Location)),
    spec("social.posts", FieldKind::List, Some(Domain::Social)),
    spec("social.group_memberships", FieldKind::List, Some(Domain::Social)),
    spec("social.flagged_associations", FieldKind::Number, Some(Domain::Social)),
    spec("social.encrypted_messaging", FieldKind::Flag, Some(Domain::Social)),
    spec("social.followers", FieldKind::Number, Some(Domain::Social)),
];

pub fn snapshot_field_spec(name: &str) -> Option<&'static FieldSpec> {
    SNAPSHOT_FIELDS.iter().find(|f| f.name == name)
}

/// Anything predicates can be evaluated against.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl CitizenSnapshot {
    /// Copy of this snapshot with every non-enabled domain removed.
    pub fn restricted_to(&self, enabled: &BTreeSet<Domain>) -> CitizenSnapshot {
        let mut out = self.clone();
        if !enabled.contains(&Domain::Health) {
            out.health = None;
        }
        if !enabled.contains(&Domain::Finance) {
            out.finance = None;
        }
        if !enabled.contains(&Domain::Judicial) {
            out.judicial = None;
        }
        if !enabled.contains(&Domain::Location) {
            out.location = None;
        }
        if !enabled.contains(&Domain::Social) {
            out.social = None;
        }
        out
    }

    /// Domains for which this snapshot carries a record.
    pub fn present_domains(&self) -> BTreeSet<Domain> {
        let mut out = BTreeSet::new();
        if self.health.is_some() {
            out.insert(Domain::Health);
        }
        if self.finance.is_some() {
            out.insert(Domain::Finance);
        }
        if self.judicial.is_some() {
            out.insert(Domain::Judicial);
        }
        if self.location.is_some() {
            out.insert(Domain::Location);
        }
        if self.social.is_some() {
            out.insert(Domain::Social);
        }
        out
    }
}

impl CitizenSnapshot {
    /// Value for a citizen template variable: a shorthand (`name`, `age`, ...)
    /// or any catalogued field name, rendered for display.
    pub fn template_var(&self, name: &str) -> Option<String> {
        if snapshot_field_spec(name).is_some() {
            return self.field(name).map(|v| v.render());
        }
        self.field(&format!("citizen.{name}")).map(|v| v.render())
    }
}

fn num(v: impl Into<f64>) -> Option<FieldValue> {
    Some(FieldValue::Number(v.into()))
}

fn list(items: &[String]) -> Option<FieldValue> {
    Some(FieldValue::List(items.to_vec()))
}

impl FieldSource for CitizenSnapshot {
    fn field(&self, name: &str) -> Option<FieldValue> {
        let (domain, key) = name.split_once('.')?;
        match domain {
            "citizen" => match key {
                "name" => Some(FieldValue::Text(self.name.clone())),
                "age" => num(self.age),
                "neighborhood" => Some(FieldValue::Text(self.neighborhood.clone())),
                "occupation" => Some(FieldValue::Text(self.occupation.clone())),
                "dependents" => num(self.dependents),
                _ => None,
            },
            "health" => {
                let h = self.health.as_ref()?;
                match key {
                    "conditions" => list(&h.conditions),
                    "mental_health_flags" => list(&h.mental_health_flags),
                    "prescriptions" => list(&h.prescriptions),
                    "substance_treatment" => Some(FieldValue::Flag(h.substance_treatment)),
                    "visits_last_year" => num(h.visits_last_year),
                    "therapy_sessions" => num(h.therapy_sessions),
                    _ => None,
                }
            }
            "finance" => {
                let f = self.finance.as_ref()?;
                match key {
                    "income" => num(f.income),
                    "debt" => num(f.debt),
                    "credit_score" => num(f.credit_score),
                    "employment_status" => Some(FieldValue::Text(f.employment_status.clone())),
                    "unusual_transactions" => num(f.unusual_transactions),
                    "large_cash_withdrawals" => num(f.large_cash_withdrawals),
                    "donation_recipients" => Some(FieldValue::List(
                        f.donations.iter().map(|d| d.recipient.clone()).collect(),
                    )),
                    "donation_total" => num(f.donations.iter().map(|d| d.amount).sum::<f64>()),
                    _ => None,
                }
            }
            "judicial" => {
                let j = self.judicial.as_ref()?;
                match key {
                    "prior_arrests" => num(j.prior_arrests),
                    "convictions" => num(j.convictions),
                    "pending_cases" => num(j.pending_cases),
                    "protest_arrests" => num(j.protest_arrests),
                    "civil_disputes" => num(j.civil_disputes),
                    _ => None,
                }
            }
            "location" => {
                let l = self.location.as_ref()?;
                match key {
                    "visited_places" => Some(FieldValue::List(
                        l.visits.iter().map(|v| v.place.clone()).collect(),
                    )),
                    "visited_categories" => {
                        let mut cats: Vec<String> =
                            l.visits.iter().map(|v| v.category.clone()).collect();
                        cats.sort();
                        cats.dedup();
                        Some(FieldValue::List(cats))
                    }
                    "curfew_violations" => num(l.curfew_violations),
                    "trips_abroad" => num(l.trips_abroad),
                    "night_activity_ratio" => num(l.night_activity_ratio),
                    _ => None,
                }
            }
            "social" => {
                let s = self.social.as_ref()?;
                match key {
                    "posts" => list(&s.posts),
                    "group_memberships" => list(&s.group_memberships),
                    "flagged_associations" => num(s.flagged_associations),
                    "encrypted_messaging" => Some(FieldValue::Flag(s.encrypted_messaging)),
                    "followers" => num(s.followers),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
