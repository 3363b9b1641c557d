//! Per-operator public awareness and anger.

use serde::{Deserialize, Serialize};

use watchfloor_common::catalog::{MetricDeltas, TierConfig};
use watchfloor_common::Metric;

/// A metric moved from one tier to another in a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEvent {
    pub metric: Metric,
    pub from: u8,
    pub to: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMetrics {
    awareness: u8,
    anger: u8,
    awareness_thresholds: [u8; 5],
    anger_thresholds: [u8; 5],
}

impl PublicMetrics {
    pub fn new(tiers: &TierConfig) -> Self {
        Self {
            awareness: 0,
            anger: 0,
            awareness_thresholds: tiers.awareness,
            anger_thresholds: tiers.anger,
        }
    }

    pub fn value(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Awareness => self.awareness,
            Metric::Anger => self.anger,
        }
    }

    pub fn tier(&self, metric: Metric) -> u8 {
        tier_for(self.thresholds(metric), self.value(metric))
    }

    pub fn awareness(&self) -> u8 {
        self.awareness
    }

    pub fn anger(&self) -> u8 {
        self.anger
    }

    fn thresholds(&self, metric: Metric) -> &[u8; 5] {
        match metric {
            Metric::Awareness => &self.awareness_thresholds,
            Metric::Anger => &self.anger_thresholds,
        }
    }

    /// Add `delta`, clamp to 0-100, and report the tier change if any.
    pub fn apply_delta(&mut self, metric: Metric, delta: i32) -> Option<TierEvent> {
        let before = self.tier(metric);
        let next = i32::from(self.value(metric)).saturating_add(delta).clamp(0, 100) as u8;
        match metric {
            Metric::Awareness => self.awareness = next,
            Metric::Anger => self.anger = next,
        }
        let after = self.tier(metric);
        (before != after).then_some(TierEvent {
            metric,
            from: before,
            to: after,
        })
    }

    /// Apply both deltas; awareness first.
    pub fn apply(&mut self, deltas: MetricDeltas) -> Vec<TierEvent> {
        [
            (Metric::Awareness, deltas.awareness),
            (Metric::Anger, deltas.anger),
        ]
        .into_iter()
        .filter(|(_, d)| *d != 0)
        .filter_map(|(metric, d)| self.apply_delta(metric, d))
        .collect()
    }
}

/// Number of thresholds at or below `value` (0-5).
pub fn tier_for(thresholds: &[u8; 5], value: u8) -> u8 {
    thresholds.iter().filter(|t| value >= **t).count() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchfloor_common::Catalog;

    fn metrics() -> PublicMetrics {
        PublicMetrics::new(&Catalog::builtin().unwrap().tiers)
    }

    #[test]
    fn anger_58_plus_5_crosses_exactly_once() {
        let mut m = metrics();
        assert!(m.apply_delta(Metric::Anger, 58).is_some());
        assert_eq!(m.tier(Metric::Anger), 3);

        let awareness_before = m.awareness();
        let event = m.apply_delta(Metric::Anger, 5).unwrap();
        assert_eq!(m.anger(), 63);
        assert_eq!(
            event,
            TierEvent {
                metric: Metric::Anger,
                from: 3,
                to: 4
            }
        );
        assert_eq!(m.awareness(), awareness_before);
    }

    #[test]
    fn no_event_within_a_tier() {
        let mut m = metrics();
        m.apply_delta(Metric::Anger, 12);
        assert_eq!(m.apply_delta(Metric::Anger, 3), None);
    }

    #[test]
    fn values_are_clamped() {
        let mut m = metrics();
        let up = m.apply_delta(Metric::Awareness, 500).unwrap();
        assert_eq!(m.awareness(), 100);
        assert_eq!(up.to, 5);
        let down = m.apply_delta(Metric::Awareness, -1000).unwrap();
        assert_eq!(m.awareness(), 0);
        assert!(down.to < down.from);
        assert_eq!(m.apply_delta(Metric::Awareness, -1), None);
    }

    #[test]
    fn extreme_deltas_stay_in_bounds() {
        let mut m = metrics();
        m.apply_delta(Metric::Anger, 50);

        let up = m.apply_delta(Metric::Anger, i32::MAX).unwrap();
        assert_eq!(m.anger(), 100);
        assert_eq!(up.to, 5);

        let down = m.apply_delta(Metric::Anger, i32::MIN).unwrap();
        assert_eq!(m.anger(), 0);
        assert_eq!(down.to, 0);
        assert_eq!(m.apply_delta(Metric::Anger, i32::MIN), None);
    }

    #[test]
    fn large_jump_is_a_single_event() {
        let mut m = metrics();
        let event = m.apply_delta(Metric::Anger, 85).unwrap();
        assert_eq!((event.from, event.to), (0, 5));
    }

    #[test]
    fn tier_is_pure_function_of_value() {
        let t = [10, 25, 40, 60, 80];
        assert_eq!(tier_for(&t, 0), 0);
        assert_eq!(tier_for(&t, 9), 0);
        assert_eq!(tier_for(&t, 10), 1);
        assert_eq!(tier_for(&t, 59), 3);
        assert_eq!(tier_for(&t, 60), 4);
        assert_eq!(tier_for(&t, 100), 5);
    }
}
