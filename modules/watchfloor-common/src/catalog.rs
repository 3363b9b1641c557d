//! Static simulation content: risk factors, correlation rules, flag actions,
//! consequence templates, directives, tier tables and world tuning.
//!
//! Loaded once from TOML, `{{config.*}}` variables resolved against the same
//! document, then validated as a whole. A catalogue that fails validation
//! never reaches a session.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::predicate::{FieldScope, KeywordLists, Predicate};
use crate::snapshot::snapshot_field_spec;
use crate::template::{resolve_config_vars, validate_template};
use crate::types::{ChannelStance, ContentRating, Domain, FlagType, Metric, ProtestStatus, TimeSkip};

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub world: WorldConfig,
    #[serde(default)]
    pub keywords: KeywordLists,
    pub risk_factors: Vec<RiskFactorConfig>,
    pub correlation_rules: Vec<CorrelationRuleConfig>,
    pub actions: Vec<ActionConfig>,
    pub outcomes: Vec<OutcomeTemplateConfig>,
    pub directives: Vec<DirectiveConfig>,
    pub tiers: TierConfig,
    pub reluctance: ReluctanceConfig,
    pub protests: ProtestConfig,
    #[serde(default)]
    pub neighborhoods: Vec<NeighborhoodConfig>,
    pub news: NewsConfig,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    pub books: BookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub regime: String,
    pub city: String,
    pub ministry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactorConfig {
    pub key: String,
    pub label: String,
    pub domain: Domain,
    /// Points added to the risk score when the factor applies (0-100).
    pub weight: u8,
    pub when: Predicate,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRuleConfig {
    pub key: String,
    pub title: String,
    pub required_domains: Vec<Domain>,
    pub when: Predicate,
    pub confidence: f64,
    pub evidence: Vec<String>,
    #[serde(default)]
    pub implications: Vec<String>,
    pub scariness: u8,
    pub rating: ContentRating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDeltas {
    #[serde(default)]
    pub awareness: i32,
    #[serde(default)]
    pub anger: i32,
}

impl MetricDeltas {
    pub const ZERO: MetricDeltas = MetricDeltas {
        awareness: 0,
        anger: 0,
    };

    pub fn is_zero(&self) -> bool {
        self.awareness == 0 && self.anger == 0
    }
}

/// Public-facing parameters of a flag type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub flag_type: FlagType,
    pub label: String,
    pub detection_probability: f64,
    pub deltas: MetricDeltas,
    /// Compared against `news.reporting_threshold` to decide whether the press picks it up.
    pub newsworthiness: u8,
    /// Compliance lost when the action is detected.
    #[serde(default)]
    pub detection_compliance_penalty: f64,
    #[serde(default)]
    pub triggers_protest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeTemplateConfig {
    pub flag_type: FlagType,
    pub skip: TimeSkip,
    pub narrative: String,
    #[serde(default)]
    pub statistics: BTreeMap<String, f64>,
    #[serde(default)]
    pub real_world_parallel: Option<String>,
    /// Scale statistics by the captured risk score (x0.5 at 0, x1.5 at 100).
    #[serde(default)]
    pub scale_with_risk: bool,
    /// Alternatives chosen by target characteristics; first match wins.
    #[serde(default)]
    pub variants: Vec<OutcomeVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeVariant {
    pub when: Predicate,
    pub narrative: String,
    #[serde(default)]
    pub statistics: BTreeMap<String, f64>,
    #[serde(default)]
    pub real_world_parallel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveConfig {
    pub key: String,
    pub week: u32,
    pub title: String,
    pub description: String,
    pub required_domains: Vec<Domain>,
    pub target_criteria: Predicate,
    pub flag_quota: u32,
    pub time_limit_hours: u32,
    pub moral_weight: u8,
    #[serde(default = "always")]
    pub unlock: Predicate,
}

fn always() -> Predicate {
    Predicate::Always
}

/// Lower bounds of tiers 1..=5 for each metric; values below the first bound are tier 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub awareness: [u8; 5],
    pub anger: [u8; 5],
    pub awareness_names: Vec<String>,
    pub anger_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReluctanceConfig {
    pub shortfall_weight: f64,
    pub hesitation_weight: f64,
    pub no_action_penalty: f64,
    pub delay_penalty: f64,
    pub warning_threshold: f64,
    pub compliance_start: f64,
    pub compliance_miss_decay: f64,
    pub compliance_no_action_decay: f64,
    pub compliance_recovery: f64,
    pub hesitation_threshold_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtestConfig {
    pub min_population: u32,
    /// Anger tier at or above which an upward crossing can spark a protest.
    pub anger_tier_trigger: u8,
    pub agent_presence_chance: f64,
    pub base_activation: f64,
    pub activation_per_tier: f64,
    pub agent_activation_bonus: f64,
    pub base_violence: f64,
    pub violence_per_tier: f64,
    pub agent_violence_bonus: f64,
    pub base_dispersal: f64,
    pub dispersal_per_tier: f64,
    pub police_suppression: f64,
    /// Share of a neighborhood's population that turns out initially, per anger tier.
    pub turnout_per_tier: f64,
    pub growth_factor: f64,
    pub arrest_share: f64,
    pub casualty_share: f64,
    pub article_deltas: ProtestArticleDeltas,
}

/// Metric deltas of the article covering a protest entering each status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtestArticleDeltas {
    pub forming: MetricDeltas,
    pub active: MetricDeltas,
    pub dispersed: MetricDeltas,
    pub violent: MetricDeltas,
    pub suppressed: MetricDeltas,
}

impl ProtestArticleDeltas {
    pub fn for_status(&self, status: ProtestStatus) -> MetricDeltas {
        match status {
            ProtestStatus::Forming => self.forming,
            ProtestStatus::Active => self.active,
            ProtestStatus::Dispersed => self.dispersed,
            ProtestStatus::Violent => self.violent,
            ProtestStatus::Suppressed => self.suppressed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodConfig {
    pub name: String,
    pub population: u32,
    /// 0.0-1.0 demographic disposition toward unrest.
    pub unrest_propensity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    pub reporting_threshold: u8,
    pub random_article_chance: f64,
    pub random_deltas: MetricDeltas,
    pub exposure_deltas: MetricDeltas,
    pub censorship_deltas: MetricDeltas,
    pub censorship_credibility_boost: u8,
    pub headlines: HeadlineTemplates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineTemplates {
    pub random: Vec<String>,
    pub action: String,
    pub exposure: String,
    pub protest: String,
    pub tier: String,
    pub censorship: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub key: String,
    pub name: String,
    pub stance: ChannelStance,
    pub credibility: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    pub chance_per_tick: f64,
    pub min_awareness_tier: u8,
    pub publish_deltas: MetricDeltas,
    pub ban_deltas: MetricDeltas,
    pub titles: Vec<BookTitle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookTitle {
    pub title: String,
    pub author: String,
}

// --- Template variable sets ---

/// Citizen shorthands usable in any citizen-facing template.
pub const CITIZEN_VARS: &[&str] = &["name", "age", "neighborhood", "occupation", "dependents"];

const EVIDENCE_EXTRA_VARS: &[&str] = &["matched"];
const OUTCOME_EXTRA_VARS: &[&str] = &["flag_type", "risk_score", "justification"];
pub const HEADLINE_VARS: &[&str] = &[
    "channel", "neighborhood", "flag_type", "status", "size", "metric", "tier_name", "title",
    "author", "banned_channel",
];

fn is_citizen_var(name: &str, extra: &[&str]) -> bool {
    CITIZEN_VARS.contains(&name) || extra.contains(&name) || snapshot_field_spec(name).is_some()
}

// --- Loading ---

impl Catalog {
    /// The catalogue compiled into the binary.
    pub fn builtin() -> SimResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let raw: toml::Value = content
            .parse()
            .context("Failed to parse catalog as TOML")?;
        let resolved = resolve_strings(&raw, &raw)?;
        let catalog: Catalog = resolved
            .try_into()
            .context("Catalog does not match the expected schema")?;
        catalog.validate()?;
        Ok(catalog)
    }

    // --- Lookups ---

    pub fn action(&self, flag_type: FlagType) -> Option<&ActionConfig> {
        self.actions.iter().find(|a| a.flag_type == flag_type)
    }

    pub fn outcome(&self, flag_type: FlagType, skip: TimeSkip) -> Option<&OutcomeTemplateConfig> {
        self.outcomes
            .iter()
            .find(|o| o.flag_type == flag_type && o.skip == skip)
    }

    pub fn directive(&self, key: &str) -> Option<&DirectiveConfig> {
        self.directives.iter().find(|d| d.key == key)
    }

    /// Directives for a week in catalogue order (branches are tried in this order).
    pub fn directives_for_week(&self, week: u32) -> impl Iterator<Item = &DirectiveConfig> {
        self.directives.iter().filter(move |d| d.week == week)
    }

    pub fn first_directive(&self) -> SimResult<&DirectiveConfig> {
        self.directives_for_week(1).next().ok_or_else(|| {
            SimError::ConfigurationMissing("no directive for week 1".to_string())
        })
    }

    pub fn neighborhood(&self, name: &str) -> Option<&NeighborhoodConfig> {
        self.neighborhoods
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    pub fn tier_names(&self, metric: Metric) -> &[String] {
        match metric {
            Metric::Awareness => &self.tiers.awareness_names,
            Metric::Anger => &self.tiers.anger_names,
        }
    }

    // --- Validation ---

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfiguration(msg));

        // Directives
        if self.directives.is_empty() {
            return Err(SimError::ConfigurationMissing("directive catalogue is empty".into()));
        }
        self.first_directive()?;
        unique_keys("directive", self.directives.iter().map(|d| d.key.as_str()))?;
        for d in &self.directives {
            if d.flag_quota == 0 || d.time_limit_hours == 0 {
                return invalid(format!("directive '{}' needs a quota and time limit", d.key));
            }
            d.target_criteria
                .validate(FieldScope::Snapshot, &self.keywords)
                .map_err(|e| SimError::InvalidConfiguration(format!("directive '{}' target: {e}", d.key)))?;
            d.unlock
                .validate(FieldScope::Session, &self.keywords)
                .map_err(|e| SimError::InvalidConfiguration(format!("directive '{}' unlock: {e}", d.key)))?;
        }
        let weeks: BTreeSet<u32> = self.directives.iter().map(|d| d.week).collect();
        for (expected, week) in (1u32..).zip(weeks.iter()) {
            if *week != expected {
                return Err(SimError::ConfigurationMissing(format!(
                    "directive weeks must be contiguous from 1; week {expected} missing"
                )));
            }
        }
        for week in weeks.iter().filter(|w| **w > 1) {
            if !self
                .directives_for_week(*week)
                .any(|d| d.unlock == Predicate::Always)
            {
                return Err(SimError::ConfigurationMissing(format!(
                    "week {week} has no directive without an unlock condition"
                )));
            }
        }

        // Risk factors
        unique_keys("risk factor", self.risk_factors.iter().map(|f| f.key.as_str()))?;
        for f in &self.risk_factors {
            if f.weight > 100 {
                return invalid(format!("risk factor '{}' weight above 100", f.key));
            }
            f.when
                .validate(FieldScope::Snapshot, &self.keywords)
                .map_err(|e| SimError::InvalidConfiguration(format!("risk factor '{}': {e}", f.key)))?;
            let foreign: Vec<Domain> = f
                .when
                .referenced_domains()
                .into_iter()
                .filter(|d| *d != f.domain)
                .collect();
            if !foreign.is_empty() {
                return invalid(format!(
                    "risk factor '{}' is {} but reads {foreign:?}",
                    f.key, f.domain
                ));
            }
            check_template(&f.evidence, EVIDENCE_EXTRA_VARS, &f.key)?;
        }

        // Correlation rules
        unique_keys("correlation rule", self.correlation_rules.iter().map(|r| r.key.as_str()))?;
        for r in &self.correlation_rules {
            if r.required_domains.is_empty() {
                return invalid(format!("correlation rule '{}' requires no domains", r.key));
            }
            if !(1..=5).contains(&r.scariness) {
                return invalid(format!("correlation rule '{}' scariness outside 1-5", r.key));
            }
            check_probability(r.confidence, &r.key)?;
            r.when
                .validate(FieldScope::Snapshot, &self.keywords)
                .map_err(|e| SimError::InvalidConfiguration(format!("correlation rule '{}': {e}", r.key)))?;
            let required: BTreeSet<Domain> = r.required_domains.iter().copied().collect();
            let read = r.when.referenced_domains();
            if !read.is_subset(&required) {
                return invalid(format!(
                    "correlation rule '{}' reads {read:?} but requires {required:?}",
                    r.key
                ));
            }
            for t in r.evidence.iter().chain(r.implications.iter()) {
                check_template(t, EVIDENCE_EXTRA_VARS, &r.key)?;
            }
        }

        // Actions and consequence templates
        for flag_type in FlagType::ALL {
            let Some(action) = self.action(flag_type) else {
                return Err(SimError::ConfigurationMissing(format!(
                    "no action configured for flag type {flag_type}"
                )));
            };
            check_probability(action.detection_probability, action.label.as_str())?;
            for skip in TimeSkip::ALL {
                let Some(t) = self.outcome(flag_type, skip) else {
                    return Err(SimError::ConfigurationMissing(format!(
                        "no outcome template for ({flag_type}, {skip})"
                    )));
                };
                let ctx = format!("outcome {flag_type}/{skip}");
                check_template(&t.narrative, OUTCOME_EXTRA_VARS, &ctx)?;
                for v in &t.variants {
                    v.when
                        .validate(FieldScope::Snapshot, &self.keywords)
                        .map_err(|e| SimError::InvalidConfiguration(format!("{ctx}: {e}")))?;
                    check_template(&v.narrative, OUTCOME_EXTRA_VARS, &ctx)?;
                }
            }
        }

        // Tiers
        for (name, table, names) in [
            ("awareness", &self.tiers.awareness, &self.tiers.awareness_names),
            ("anger", &self.tiers.anger, &self.tiers.anger_names),
        ] {
            if table[0] == 0 || table.windows(2).any(|w| w[0] >= w[1]) || table[4] > 100 {
                return invalid(format!("{name} tier table must be strictly increasing in 1..=100"));
            }
            if names.len() != 6 {
                return invalid(format!("{name} needs 6 tier names, got {}", names.len()));
            }
        }

        // Reluctance
        let r = &self.reluctance;
        if !(0.0..=100.0).contains(&r.warning_threshold)
            || !(0.0..=100.0).contains(&r.compliance_start)
        {
            return invalid("reluctance thresholds must be within 0-100".into());
        }

        // Protests
        let p = &self.protests;
        for (label, v) in [
            ("agent_presence_chance", p.agent_presence_chance),
            ("base_activation", p.base_activation),
            ("base_violence", p.base_violence),
            ("base_dispersal", p.base_dispersal),
            ("police_suppression", p.police_suppression),
        ] {
            check_probability(v, label)?;
        }
        for n in &self.neighborhoods {
            check_probability(n.unrest_propensity, &n.name)?;
        }

        // News and books
        check_probability(self.news.random_article_chance, "random_article_chance")?;
        check_probability(self.books.chance_per_tick, "book chance_per_tick")?;
        unique_keys("channel", self.channels.iter().map(|c| c.key.as_str()))?;
        let h = &self.news.headlines;
        for t in h
            .random
            .iter()
            .chain([&h.action, &h.exposure, &h.protest, &h.tier, &h.censorship, &h.summary])
        {
            validate_template(t, |v| HEADLINE_VARS.contains(&v))
                .map_err(|e| SimError::InvalidConfiguration(format!("headline: {e}")))?;
        }
        if h.random.is_empty() {
            return invalid("news.headlines.random must not be empty".into());
        }

        Ok(())
    }
}

/// Resolve `{{config.*}}` in every string of the document except the `world` table itself.
fn resolve_strings(value: &toml::Value, root: &toml::Value) -> SimResult<toml::Value> {
    Ok(match value {
        toml::Value::String(s) => toml::Value::String(resolve_config_vars(s, root)?),
        toml::Value::Array(items) => toml::Value::Array(
            items
                .iter()
                .map(|v| resolve_strings(v, root))
                .collect::<SimResult<Vec<_>>>()?,
        ),
        toml::Value::Table(table) => {
            let mut out = toml::map::Map::new();
            for (k, v) in table {
                let resolved = if k == "world" && std::ptr::eq(value, root) {
                    v.clone()
                } else {
                    resolve_strings(v, root)?
                };
                out.insert(k.clone(), resolved);
            }
            toml::Value::Table(out)
        }
        other => other.clone(),
    })
}

fn unique_keys<'a>(kind: &str, keys: impl Iterator<Item = &'a str>) -> SimResult<()> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(SimError::InvalidConfiguration(format!("duplicate {kind} key '{key}'")));
        }
    }
    Ok(())
}

fn check_probability(p: f64, what: &str) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::InvalidConfiguration(format!(
            "{what}: probability {p} outside 0-1"
        )))
    }
}

fn check_template(template: &str, extra: &[&str], ctx: &str) -> SimResult<()> {
    validate_template(template, |v| is_citizen_var(v, extra))
        .map_err(|e| SimError::InvalidConfiguration(format!("{ctx}: {e}")))
}
