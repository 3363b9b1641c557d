//! Cross-domain inference rules.
//!
//! A rule fires only when every domain it requires is enabled for the
//! operator. Every other rule is reported per missing domain, without the
//! rule itself and without looking at data the operator cannot see.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use watchfloor_common::catalog::CorrelationRuleConfig;
use watchfloor_common::template::render;
use watchfloor_common::{Catalog, CitizenSnapshot, ContentRating, Domain};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationAlert {
    pub rule_key: String,
    pub title: String,
    pub domains: Vec<Domain>,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub implications: Vec<String>,
    pub scariness: u8,
    pub rating: ContentRating,
}

/// A domain that would reveal `hidden_rules` more inferences once enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockHint {
    pub domain: Domain,
    pub hidden_rules: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub alerts: Vec<CorrelationAlert>,
    pub unlockable: Vec<UnlockHint>,
}

pub struct CorrelationEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn evaluate(&self, snapshot: &CitizenSnapshot, enabled: &BTreeSet<Domain>) -> CorrelationReport {
        let visible = snapshot.restricted_to(enabled);
        let mut alerts = Vec::new();
        let mut hidden: BTreeMap<Domain, usize> = BTreeMap::new();

        for rule in &self.catalog.correlation_rules {
            let missing: Vec<Domain> = rule
                .required_domains
                .iter()
                .copied()
                .filter(|d| !enabled.contains(d))
                .collect();

            if missing.is_empty() {
                if let Some(alert) = self.fire(rule, &visible) {
                    alerts.push(alert);
                }
            } else {
                for domain in missing {
                    *hidden.entry(domain).or_default() += 1;
                }
            }
        }

        alerts.sort_by(|a, b| {
            b.scariness
                .cmp(&a.scariness)
                .then(b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.rule_key.cmp(&b.rule_key))
        });

        CorrelationReport {
            alerts,
            unlockable: hidden
                .into_iter()
                .map(|(domain, hidden_rules)| UnlockHint {
                    domain,
                    hidden_rules,
                })
                .collect(),
        }
    }

    fn fire(&self, rule: &CorrelationRuleConfig, visible: &CitizenSnapshot) -> Option<CorrelationAlert> {
        if !rule.when.referenced_domains().is_subset(&visible.present_domains()) {
            return None;
        }
        let mut hits = Vec::new();
        if !rule
            .when
            .evaluate_with_hits(visible, &self.catalog.keywords, &mut hits)
        {
            return None;
        }
        let matched = hits.join(", ");
        let fill = |t: &String| {
            render(t, |var| match var {
                "matched" => Some(matched.clone()),
                other => visible.template_var(other),
            })
        };

        Some(CorrelationAlert {
            rule_key: rule.key.clone(),
            title: rule.title.clone(),
            domains: rule.required_domains.clone(),
            confidence: rule.confidence,
            evidence: rule.evidence.iter().map(&fill).collect(),
            implications: rule.implications.iter().map(&fill).collect(),
            scariness: rule.scariness,
            rating: rule.rating,
        })
    }
}
