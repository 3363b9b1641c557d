//! Risk scoring of a citizen from the domains an operator can see.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::template::render;
use watchfloor_common::{Catalog, CitizenSnapshot, Domain, FlagType, RiskLevel, Urgency};

use crate::correlation::{CorrelationAlert, CorrelationEngine, UnlockHint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub key: String,
    pub label: String,
    pub domain: Domain,
    pub weight: u8,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: FlagType,
    pub urgency: Urgency,
    pub rationale: String,
}

/// Point-in-time assessment of one citizen for one operator. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub citizen_id: Uuid,
    pub citizen_name: String,
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<ContributingFactor>,
    pub correlations: Vec<CorrelationAlert>,
    pub unlockable: Vec<UnlockHint>,
    pub recommended_actions: Vec<RecommendedAction>,
    pub enabled_domains: Vec<Domain>,
    pub assessed_at: DateTime<Utc>,
}

pub struct RiskScorer<'a> {
    catalog: &'a Catalog,
}

impl<'a> RiskScorer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Sum the weights of every applicable factor, clamped to 0-100.
    /// Factors in disabled or absent domains contribute nothing.
    pub fn score(
        &self,
        snapshot: &CitizenSnapshot,
        enabled: &BTreeSet<Domain>,
    ) -> (u8, Vec<ContributingFactor>) {
        let visible = snapshot.restricted_to(enabled);
        let present = visible.present_domains();
        let mut total: u32 = 0;
        let mut factors = Vec::new();

        for factor in &self.catalog.risk_factors {
            // A factor only reads records the snapshot actually has, so a
            // negated clause cannot fire on a missing record.
            if !present.contains(&factor.domain)
                || !factor.when.referenced_domains().is_subset(&present)
            {
                continue;
            }
            let mut hits = Vec::new();
            if !factor
                .when
                .evaluate_with_hits(&visible, &self.catalog.keywords, &mut hits)
            {
                continue;
            }
            total += u32::from(factor.weight);
            let matched = hits.join(", ");
            factors.push(ContributingFactor {
                key: factor.key.clone(),
                label: factor.label.clone(),
                domain: factor.domain,
                weight: factor.weight,
                evidence: render(&factor.evidence, |var| match var {
                    "matched" => Some(matched.clone()),
                    other => visible.template_var(other),
                }),
            });
        }

        (total.min(100) as u8, factors)
    }

    pub fn assess(
        &self,
        snapshot: &CitizenSnapshot,
        enabled: &BTreeSet<Domain>,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let (score, factors) = self.score(snapshot, enabled);
        let level = RiskLevel::from_score(score);
        let correlations = CorrelationEngine::new(self.catalog).evaluate(snapshot, enabled);
        let recommended_actions = recommend(level, &factors);

        RiskAssessment {
            citizen_id: snapshot.citizen_id,
            citizen_name: snapshot.name.clone(),
            score,
            level,
            factors,
            correlations: correlations.alerts,
            unlockable: correlations.unlockable,
            recommended_actions,
            enabled_domains: enabled.iter().copied().collect(),
            assessed_at: now,
        }
    }
}

/// The ministry's suggested response for a risk band.
pub fn recommend(level: RiskLevel, factors: &[ContributingFactor]) -> Vec<RecommendedAction> {
    let top = factors
        .iter()
        .max_by(|a, b| a.weight.cmp(&b.weight).then_with(|| b.key.cmp(&a.key)))
        .map(|f| f.label.as_str())
        .unwrap_or("no significant indicators");

    let (action, urgency) = match level {
        RiskLevel::Low => (FlagType::Monitoring, Urgency::Routine),
        RiskLevel::Moderate => (FlagType::Monitoring, Urgency::Priority),
        RiskLevel::Elevated => (FlagType::Restriction, Urgency::Priority),
        RiskLevel::High => (FlagType::Intervention, Urgency::Priority),
        RiskLevel::Severe => (FlagType::Detention, Urgency::Immediate),
    };

    let mut out = vec![RecommendedAction {
        action,
        urgency,
        rationale: format!("{level} risk; primary indicator: {top}"),
    }];
    if action != FlagType::Monitoring {
        out.push(RecommendedAction {
            action: FlagType::Monitoring,
            urgency: Urgency::Routine,
            rationale: "Maintain observation of associates".to_string(),
        });
    }
    out
}
