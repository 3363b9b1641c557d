//! Structured predicates over named fields.
//!
//! Rule conditions in the catalogue are data, not code: comparisons, flags and
//! keyword matches over the fields listed in [`SNAPSHOT_FIELDS`] (citizen
//! data) or [`SESSION_FIELDS`] (directive unlock conditions). Every predicate
//! is validated against those tables when the catalogue loads.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::snapshot::{snapshot_field_spec, FieldKind, FieldSource, FieldValue};
use crate::types::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl CompareOp {
    fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Gte => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Lte => lhs <= rhs,
            CompareOp::Eq => (lhs - rhs).abs() < f64::EPSILON,
            CompareOp::Ne => (lhs - rhs).abs() >= f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Compare {
        field: String,
        op: CompareOp,
        value: f64,
    },
    Flag {
        field: String,
    },
    /// Case-insensitive substring match of any needle against a text or list field.
    /// Needles come from `any_of` and/or a named keyword list.
    Contains {
        field: String,
        #[serde(default)]
        any_of: Vec<String>,
        #[serde(default)]
        keywords: Option<String>,
    },
    Equals {
        field: String,
        value: String,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// Named keyword lists referenced by `contains` predicates.
pub type KeywordLists = BTreeMap<String, Vec<String>>;

/// Numeric session fields available to directive unlock conditions.
pub const SESSION_FIELDS: &[&str] = &[
    "session.compliance_score",
    "session.reluctance_score",
    "session.awareness",
    "session.anger",
    "session.awareness_tier",
    "session.anger_tier",
    "session.flags_submitted",
    "session.warnings",
    "session.week",
];

/// Which field namespace a predicate is allowed to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    Snapshot,
    Session,
}

impl FieldScope {
    fn kind_of(&self, name: &str) -> Option<FieldKind> {
        match self {
            FieldScope::Snapshot => snapshot_field_spec(name).map(|s| s.kind),
            FieldScope::Session => SESSION_FIELDS
                .contains(&name)
                .then_some(FieldKind::Number),
        }
    }
}

impl Predicate {
    pub fn evaluate(&self, source: &dyn FieldSource, keywords: &KeywordLists) -> bool {
        let mut hits = Vec::new();
        self.evaluate_with_hits(source, keywords, &mut hits)
    }

    /// Evaluate, collecting the keywords that matched in `contains` clauses.
    /// A missing field (absent domain) makes the clause false.
    pub fn evaluate_with_hits(
        &self,
        source: &dyn FieldSource,
        keywords: &KeywordLists,
        hits: &mut Vec<String>,
    ) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Compare { field, op, value } => match source.field(field) {
                Some(FieldValue::Number(n)) => op.apply(n, *value),
                _ => false,
            },
            Predicate::Flag { field } => matches!(source.field(field), Some(FieldValue::Flag(true))),
            Predicate::Equals { field, value } => match source.field(field) {
                Some(FieldValue::Text(s)) => s.eq_ignore_ascii_case(value),
                _ => false,
            },
            Predicate::Contains {
                field,
                any_of,
                keywords: list,
            } => {
                let haystack: Vec<String> = match source.field(field) {
                    Some(FieldValue::Text(s)) => vec![s.to_lowercase()],
                    Some(FieldValue::List(items)) => {
                        items.iter().map(|s| s.to_lowercase()).collect()
                    }
                    _ => return false,
                };
                let named = list
                    .as_ref()
                    .and_then(|name| keywords.get(name))
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                let mut matched = false;
                for needle in any_of.iter().chain(named.iter()) {
                    let lowered = needle.to_lowercase();
                    if haystack.iter().any(|h| h.contains(&lowered)) {
                        matched = true;
                        if !hits.contains(needle) {
                            hits.push(needle.clone());
                        }
                    }
                }
                matched
            }
            Predicate::All(preds) => {
                // Every clause runs so hits are complete
                let mut ok = true;
                for p in preds {
                    ok &= p.evaluate_with_hits(source, keywords, hits);
                }
                ok
            }
            Predicate::Any(preds) => {
                let mut ok = false;
                for p in preds {
                    ok |= p.evaluate_with_hits(source, keywords, hits);
                }
                ok
            }
            Predicate::Not(inner) => {
                let mut scratch = Vec::new();
                !inner.evaluate_with_hits(source, keywords, &mut scratch)
            }
        }
    }

    /// Every field name this predicate references.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Always => {}
            Predicate::Compare { field, .. }
            | Predicate::Flag { field }
            | Predicate::Contains { field, .. }
            | Predicate::Equals { field, .. } => out.push(field.as_str()),
            Predicate::All(preds) | Predicate::Any(preds) => {
                for p in preds {
                    p.collect_fields(out);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Data domains a snapshot predicate reads from.
    pub fn referenced_domains(&self) -> BTreeSet<Domain> {
        self.referenced_fields()
            .into_iter()
            .filter_map(|f| snapshot_field_spec(f).and_then(|s| s.domain))
            .collect()
    }

    /// Static check: every field exists in `scope` with a kind the clause can use,
    /// and every named keyword list exists.
    pub fn validate(&self, scope: FieldScope, keywords: &KeywordLists) -> Result<(), String> {
        let expect = |field: &str, allowed: &[FieldKind]| -> Result<(), String> {
            match scope.kind_of(field) {
                None => Err(format!("unknown field '{field}'")),
                Some(kind) if allowed.contains(&kind) => Ok(()),
                Some(kind) => Err(format!("field '{field}' is {kind:?}, expected one of {allowed:?}")),
            }
        };

        match self {
            Predicate::Always => Ok(()),
            Predicate::Compare { field, .. } => expect(field, &[FieldKind::Number]),
            Predicate::Flag { field } => expect(field, &[FieldKind::Flag]),
            Predicate::Equals { field, .. } => expect(field, &[FieldKind::Text]),
            Predicate::Contains {
                field,
                any_of,
                keywords: list,
            } => {
                expect(field, &[FieldKind::Text, FieldKind::List])?;
                if let Some(name) = list {
                    if !keywords.contains_key(name) {
                        return Err(format!("unknown keyword list '{name}'"));
                    }
                } else if any_of.is_empty() {
                    return Err(format!("contains on '{field}' has no needles"));
                }
                Ok(())
            }
            Predicate::All(preds) | Predicate::Any(preds) => {
                if preds.is_empty() {
                    return Err("empty all/any clause".to_string());
                }
                preds.iter().try_for_each(|p| p.validate(scope, keywords))
            }
            Predicate::Not(inner) => inner.validate(scope, keywords),
        }
    }
}
