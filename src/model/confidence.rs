//! Data-confidence scoring.
//!
//! Every scraped item, graph node, and derived output carries a
//! [`ConfidenceScore`] describing how much the pipeline trusts the underlying
//! data. The score combines a source tier, a freshness decay, and a
//! cross-reference bonus:
//!
//! `final = clamp(base_tier_score * freshness * cross_ref_bonus, 0, 1)`
//!
//! This is distinct from the per-program Confidence Index (CI), which is a
//! policy-risk score, not a data-quality score.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Age at which freshness starts decaying, in days.
pub const DECAY_START_DAYS: i64 = 30;
/// Age at which freshness bottoms out at [`FLOOR`], in days.
pub const DECAY_END_DAYS: i64 = 90;

const FLOOR: f64 = 0.3;

/// Source-quality tier. T1 is primary federal data; T6 is an unpopulated
/// placeholder and always scores 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
}

impl Tier {
    /// Base score for this tier.
    pub fn base_score(self) -> f64 {
        match self {
            Tier::T1 => 1.00,
            Tier::T2 => 0.95,
            Tier::T3 => 0.85,
            Tier::T4 => 0.70,
            Tier::T5 => 0.60,
            Tier::T6 => 0.00,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::T1 => write!(f, "T1"),
            Tier::T2 => write!(f, "T2"),
            Tier::T3 => write!(f, "T3"),
            Tier::T4 => write!(f, "T4"),
            Tier::T5 => write!(f, "T5"),
            Tier::T6 => write!(f, "T6"),
        }
    }
}

/// Piecewise-sigmoid freshness decay.
///
/// 1.0 up to [`DECAY_START_DAYS`], 0.3 from [`DECAY_END_DAYS`] on, a logistic
/// ramp between, and 0.0 when the timestamp is missing entirely.
pub fn freshness_decay(published: Option<NaiveDate>, as_of: NaiveDate) -> f64 {
    let Some(published) = published else {
        return 0.0;
    };
    let age = (as_of - published).num_days();
    if age <= DECAY_START_DAYS {
        return 1.0;
    }
    if age >= DECAY_END_DAYS {
        return FLOOR;
    }
    let span = (DECAY_END_DAYS - DECAY_START_DAYS) as f64;
    let mid = DECAY_START_DAYS as f64 + span / 2.0;
    let steep = 10.0 / span;
    let sigmoid = 1.0 / (1.0 + (steep * (age as f64 - mid)).exp());
    FLOOR + (1.0 - FLOOR) * sigmoid
}

/// Cross-reference bonus: 1.0 for a single source, 1.05 for two, 1.10 for
/// three or more.
pub fn cross_ref_bonus(source_count: usize) -> f64 {
    match source_count {
        0 | 1 => 1.00,
        2 => 1.05,
        _ => 1.10,
    }
}

/// A composed confidence score attached to an item, node, or derived output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub tier: Tier,
    pub freshness: f64,
    pub cross_ref_bonus: f64,
    #[serde(rename = "final")]
    pub final_score: f64,
    pub source: String,
    pub as_of: NaiveDate,
}

impl ConfidenceScore {
    /// Compose a score from its factors.
    pub fn new(
        tier: Tier,
        freshness: f64,
        cross_refs: usize,
        source: impl Into<String>,
        as_of: NaiveDate,
    ) -> Self {
        let freshness = freshness.clamp(0.0, 1.0);
        let bonus = cross_ref_bonus(cross_refs);
        let final_score = (tier.base_score() * freshness * bonus).clamp(0.0, 1.0);
        Self {
            tier,
            freshness,
            cross_ref_bonus: bonus,
            final_score,
            source: source.into(),
            as_of,
        }
    }

    /// A score at full freshness with no cross-reference bonus. Used for
    /// statutory dates and other data that does not age within a scan cycle.
    pub fn tiered(tier: Tier, source: impl Into<String>, as_of: NaiveDate) -> Self {
        Self::new(tier, 1.0, 1, source, as_of)
    }

    /// A zero-confidence placeholder for unpopulated data.
    pub fn placeholder(source: impl Into<String>, as_of: NaiveDate) -> Self {
        Self::new(Tier::T6, 1.0, 1, source, as_of)
    }

    /// Downgrade to a lower tier, keeping freshness and provenance.
    ///
    /// Used when a field is recovered by text parsing rather than taken from
    /// structured data. Never upgrades.
    pub fn degraded_to(&self, tier: Tier) -> Self {
        let tier = self.tier.max(tier);
        let final_score = (tier.base_score() * self.freshness * self.cross_ref_bonus).min(1.0);
        Self {
            tier,
            final_score,
            ..self.clone()
        }
    }

    /// The lower-confidence of two scores, for propagation into derived
    /// outputs.
    pub fn min(self, other: Self) -> Self {
        if other.final_score < self.final_score {
            other
        } else {
            self
        }
    }
}

/// Weighted mean of section scores for an aggregate confidence summary.
///
/// Weights need not sum to 1; they are normalized. An empty input scores 0.
pub fn weighted_mean(parts: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = parts.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = parts.iter().map(|(score, w)| score * w).sum();
    (sum / total_weight).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tier_base_scores() {
        assert_eq!(Tier::T1.base_score(), 1.00);
        assert_eq!(Tier::T3.base_score(), 0.85);
        assert_eq!(Tier::T6.base_score(), 0.00);
    }

    #[test]
    fn test_freshness_plateau_and_floor() {
        let today = day(2026, 3, 1);
        assert_eq!(freshness_decay(Some(day(2026, 2, 20)), today), 1.0);
        assert_eq!(freshness_decay(Some(day(2026, 1, 30)), today), 1.0);
        assert_eq!(freshness_decay(Some(day(2025, 11, 1)), today), 0.3);
        assert_eq!(freshness_decay(None, today), 0.0);
    }

    #[test]
    fn test_freshness_ramp_is_monotonic() {
        let today = day(2026, 6, 1);
        let mut last = 1.0;
        for age in 31..90 {
            let f = freshness_decay(Some(today - chrono::Duration::days(age)), today);
            assert!(f < last, "freshness should strictly decay across the ramp");
            assert!(f > 0.3 && f < 1.0);
            last = f;
        }
    }

    #[test]
    fn test_cross_ref_bonus_steps() {
        assert_eq!(cross_ref_bonus(1), 1.00);
        assert_eq!(cross_ref_bonus(2), 1.05);
        assert_eq!(cross_ref_bonus(3), 1.10);
        assert_eq!(cross_ref_bonus(7), 1.10);
    }

    #[test]
    fn test_t6_is_always_zero() {
        let score = ConfidenceScore::new(Tier::T6, 1.0, 3, "placeholder", day(2026, 1, 1));
        assert_eq!(score.final_score, 0.0);
    }

    #[test]
    fn test_degrade_never_upgrades() {
        let today = day(2026, 1, 1);
        let t3 = ConfidenceScore::tiered(Tier::T3, "federal_register", today);
        assert_eq!(t3.degraded_to(Tier::T1).tier, Tier::T3);
        assert_eq!(t3.degraded_to(Tier::T4).tier, Tier::T4);
    }

    #[test]
    fn test_min_propagation() {
        let today = day(2026, 1, 1);
        let hi = ConfidenceScore::tiered(Tier::T1, "congress", today);
        let lo = ConfidenceScore::tiered(Tier::T5, "schema", today);
        assert_eq!(hi.clone().min(lo.clone()), lo);
        assert_eq!(lo.clone().min(hi), lo);
    }

    #[test]
    fn test_weighted_mean() {
        let agg = weighted_mean(&[(1.0, 0.25), (0.5, 0.75)]);
        assert!((agg - 0.625).abs() < 1e-9);
        assert_eq!(weighted_mean(&[]), 0.0);
    }

    proptest! {
        #[test]
        fn prop_final_score_in_unit_interval(
            tier_idx in 0usize..6,
            freshness in -1.0f64..2.0,
            refs in 0usize..6,
        ) {
            let tier = [Tier::T1, Tier::T2, Tier::T3, Tier::T4, Tier::T5, Tier::T6][tier_idx];
            let score = ConfidenceScore::new(tier, freshness, refs, "x", day(2026, 1, 1));
            prop_assert!((0.0..=1.0).contains(&score.final_score));
            if tier == Tier::T6 {
                prop_assert_eq!(score.final_score, 0.0);
            }
        }

        #[test]
        fn prop_freshness_in_unit_interval(age in 0i64..400) {
            let today = day(2026, 6, 1);
            let f = freshness_decay(Some(today - chrono::Duration::days(age)), today);
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}
