use serde::{Deserialize, Serialize};

// --- Data domains ---

/// A cross-domain record family an operator may be granted access to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Health,
    Finance,
    Judicial,
    Location,
    Social,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Health,
        Domain::Finance,
        Domain::Judicial,
        Domain::Location,
        Domain::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Health => "health",
            Domain::Finance => "finance",
            Domain::Judicial => "judicial",
            Domain::Location => "location",
            Domain::Social => "social",
        }
    }

    pub fn parse(s: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Operator decisions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    Monitoring,
    Restriction,
    Intervention,
    Detention,
}

impl FlagType {
    pub const ALL: [FlagType; 4] = [
        FlagType::Monitoring,
        FlagType::Restriction,
        FlagType::Intervention,
        FlagType::Detention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::Monitoring => "monitoring",
            FlagType::Restriction => "restriction",
            FlagType::Intervention => "intervention",
            FlagType::Detention => "detention",
        }
    }
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorStatus {
    Active,
    UnderReview,
    Terminated,
}

impl OperatorStatus {
    /// ACTIVE and UNDER_REVIEW may swap back and forth; TERMINATED is absorbing.
    pub fn can_transition_to(&self, next: OperatorStatus) -> bool {
        match (self, next) {
            (OperatorStatus::Terminated, _) => false,
            (a, b) if *a == b => false,
            (OperatorStatus::Active, OperatorStatus::UnderReview) => true,
            (OperatorStatus::UnderReview, OperatorStatus::Active) => true,
            (_, OperatorStatus::Terminated) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OperatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorStatus::Active => write!(f, "active"),
            OperatorStatus::UnderReview => write!(f, "under_review"),
            OperatorStatus::Terminated => write!(f, "terminated"),
        }
    }
}

// --- Risk ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Severe,
}

impl RiskLevel {
    /// Band a clamped 0-100 score.
    pub fn from_score(score: u8) -> RiskLevel {
        match score {
            0..=20 => RiskLevel::Low,
            21..=40 => RiskLevel::Moderate,
            41..=60 => RiskLevel::Elevated,
            61..=80 => RiskLevel::High,
            _ => RiskLevel::Severe,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::Elevated => write!(f, "elevated"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Severe => write!(f, "severe"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Routine,
    Priority,
    Immediate,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Mild,
    Moderate,
    Disturbing,
}

// --- Consequences ---

/// Points on the consequence timeline following a flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TimeSkip {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "1_week")]
    OneWeek,
    #[serde(rename = "1_month")]
    OneMonth,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "1_year")]
    OneYear,
}

impl TimeSkip {
    pub const ALL: [TimeSkip; 5] = [
        TimeSkip::Immediate,
        TimeSkip::OneWeek,
        TimeSkip::OneMonth,
        TimeSkip::SixMonths,
        TimeSkip::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSkip::Immediate => "immediate",
            TimeSkip::OneWeek => "1_week",
            TimeSkip::OneMonth => "1_month",
            TimeSkip::SixMonths => "6_months",
            TimeSkip::OneYear => "1_year",
        }
    }
}

impl std::fmt::Display for TimeSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Public reaction ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Awareness,
    Anger,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Awareness => write!(f, "awareness"),
            Metric::Anger => write!(f, "anger"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProtestStatus {
    Forming,
    Active,
    Dispersed,
    Violent,
    Suppressed,
}

impl ProtestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProtestStatus::Dispersed | ProtestStatus::Violent | ProtestStatus::Suppressed
        )
    }

    /// Allowed edges of the protest state machine.
    pub fn can_transition_to(&self, next: ProtestStatus) -> bool {
        matches!(
            (self, next),
            (ProtestStatus::Forming, ProtestStatus::Active)
                | (ProtestStatus::Forming, ProtestStatus::Dispersed)
                | (ProtestStatus::Active, ProtestStatus::Violent)
                | (ProtestStatus::Active, ProtestStatus::Suppressed)
                | (ProtestStatus::Active, ProtestStatus::Dispersed)
        )
    }
}

impl std::fmt::Display for ProtestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtestStatus::Forming => write!(f, "forming"),
            ProtestStatus::Active => write!(f, "active"),
            ProtestStatus::Dispersed => write!(f, "dispersed"),
            ProtestStatus::Violent => write!(f, "violent"),
            ProtestStatus::Suppressed => write!(f, "suppressed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    Random,
    Triggered,
    Exposure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStance {
    StateAligned,
    Neutral,
    Independent,
    Critical,
}

impl ChannelStance {
    /// How strongly coverage from this stance moves public metrics.
    pub fn delta_multiplier(&self) -> f64 {
        match self {
            ChannelStance::StateAligned => 0.25,
            ChannelStance::Neutral => 0.75,
            ChannelStance::Independent => 1.0,
            ChannelStance::Critical => 1.25,
        }
    }

    /// Channels that gain credibility when a peer is censored.
    pub fn is_independent(&self) -> bool {
        matches!(self, ChannelStance::Independent | ChannelStance::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Pending,
    Published,
    Banned,
}
