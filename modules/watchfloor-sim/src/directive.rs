//! Directive progression: which directive comes next, and what the operator may see.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use watchfloor_common::catalog::DirectiveConfig;
use watchfloor_common::{Catalog, CitizenSnapshot, Domain, FieldSource, FieldValue};

/// Session values that directive unlock conditions may read (`session.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFields {
    pub compliance_score: f64,
    pub reluctance_score: f64,
    pub awareness: u8,
    pub anger: u8,
    pub awareness_tier: u8,
    pub anger_tier: u8,
    pub flags_submitted: u32,
    pub warnings: u32,
    pub week: u32,
}

impl FieldSource for SessionFields {
    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name.strip_prefix("session.")? {
            "compliance_score" => self.compliance_score,
            "reluctance_score" => self.reluctance_score,
            "awareness" => f64::from(self.awareness),
            "anger" => f64::from(self.anger),
            "awareness_tier" => f64::from(self.awareness_tier),
            "anger_tier" => f64::from(self.anger_tier),
            "flags_submitted" => f64::from(self.flags_submitted),
            "warnings" => f64::from(self.warnings),
            "week" => f64::from(self.week),
            _ => return None,
        };
        Some(FieldValue::Number(value))
    }
}

/// First directive of the following week whose unlock condition holds.
/// Catalogue validation guarantees every later week an unconditional
/// directive, so `None` means the catalogue has no further week and the
/// campaign is over.
pub fn next_directive<'c>(catalog: &'c Catalog, fields: &SessionFields) -> Option<&'c DirectiveConfig> {
    catalog
        .directives_for_week(fields.week + 1)
        .find(|d| d.unlock.evaluate(fields, &catalog.keywords))
}

/// Domains granted so far. Access only widens as directives advance.
pub fn widen_domains(current: &BTreeSet<Domain>, directive: &DirectiveConfig) -> BTreeSet<Domain> {
    current
        .iter()
        .chain(directive.required_domains.iter())
        .copied()
        .collect()
}

/// Whether a citizen fits the directive's targeting, judged on visible data only.
pub fn matches_target(
    catalog: &Catalog,
    directive: &DirectiveConfig,
    snapshot: &CitizenSnapshot,
    enabled: &BTreeSet<Domain>,
) -> bool {
    directive
        .target_criteria
        .evaluate(&snapshot.restricted_to(enabled), &catalog.keywords)
}
