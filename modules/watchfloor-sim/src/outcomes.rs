//! Flag submission records and their consequence chains.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::catalog::OutcomeTemplateConfig;
use watchfloor_common::template::render;
use watchfloor_common::{Catalog, CitizenSnapshot, FlagType, SimError, SimResult, TimeSkip};

use crate::random::RandomSource;

/// A submitted flag. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenFlag {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub citizen_id: Uuid,
    pub flag_type: FlagType,
    pub justification: String,
    /// Risk score captured at submission.
    pub risk_score: u8,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub skip: TimeSkip,
    pub narrative: String,
    pub statistics: BTreeMap<String, f64>,
    pub real_world_parallel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOutcome {
    pub flag_id: Uuid,
    pub detected: bool,
    /// One entry per time skip, in timeline order.
    pub entries: Vec<OutcomeEntry>,
}

pub struct OutcomeResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> OutcomeResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Single Bernoulli draw with the action's detection probability.
    pub fn roll_detection(&self, flag_type: FlagType, rng: &mut dyn RandomSource) -> SimResult<bool> {
        let action = self.catalog.action(flag_type).ok_or_else(|| {
            SimError::ConfigurationMissing(format!("no action configured for {flag_type}"))
        })?;
        Ok(rng.chance(action.detection_probability))
    }

    /// Deterministic chain for a flag against its target.
    pub fn build_chain(&self, flag: &CitizenFlag, target: &CitizenSnapshot) -> SimResult<Vec<OutcomeEntry>> {
        TimeSkip::ALL
            .into_iter()
            .map(|skip| {
                let template = self.catalog.outcome(flag.flag_type, skip).ok_or_else(|| {
                    SimError::ConfigurationMissing(format!(
                        "no outcome template for ({}, {skip})",
                        flag.flag_type
                    ))
                })?;
                Ok(self.entry(template, flag, target))
            })
            .collect()
    }

    pub fn resolve(
        &self,
        flag: &CitizenFlag,
        target: &CitizenSnapshot,
        rng: &mut dyn RandomSource,
    ) -> SimResult<FlagOutcome> {
        let detected = self.roll_detection(flag.flag_type, rng)?;
        Ok(FlagOutcome {
            flag_id: flag.id,
            detected,
            entries: self.build_chain(flag, target)?,
        })
    }

    fn entry(&self, template: &OutcomeTemplateConfig, flag: &CitizenFlag, target: &CitizenSnapshot) -> OutcomeEntry {
        let variant = template
            .variants
            .iter()
            .find(|v| v.when.evaluate(target, &self.catalog.keywords));

        let (narrative, statistics, parallel) = match variant {
            Some(v) => (
                &v.narrative,
                &v.statistics,
                v.real_world_parallel.as_ref().or(template.real_world_parallel.as_ref()),
            ),
            None => (
                &template.narrative,
                &template.statistics,
                template.real_world_parallel.as_ref(),
            ),
        };

        let risk_factor = 0.5 + f64::from(flag.risk_score) / 100.0;
        let statistics = statistics
            .iter()
            .map(|(k, v)| {
                let value = if template.scale_with_risk {
                    (v * risk_factor).round()
                } else {
                    *v
                };
                (k.clone(), value)
            })
            .collect();

        OutcomeEntry {
            skip: template.skip,
            narrative: render(narrative, |var| match var {
                "flag_type" => Some(flag.flag_type.to_string()),
                "risk_score" => Some(flag.risk_score.to_string()),
                "justification" => Some(flag.justification.clone()),
                other => target.template_var(other),
            }),
            statistics,
            real_world_parallel: parallel.cloned(),
        }
    }
}

/// Chains by flag id. The first chain stored for a flag is the one kept.
#[derive(Debug, Clone, Default)]
pub struct OutcomeCache {
    chains: HashMap<Uuid, FlagOutcome>,
}

impl OutcomeCache {
    pub fn get(&self, flag_id: Uuid) -> Option<&FlagOutcome> {
        self.chains.get(&flag_id)
    }

    pub fn store(&mut self, outcome: FlagOutcome) -> &FlagOutcome {
        self.chains.entry(outcome.flag_id).or_insert(outcome)
    }
}
