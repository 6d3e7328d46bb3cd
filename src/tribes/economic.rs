//! Economic impact framing for packet contexts.
//!
//! Stateless arithmetic over a Tribe's cached award totals: benefit-cost
//! framing at the standard 4:1 mitigation ratio, a regional output
//! multiplier, and a jobs-per-obligated-dollar coefficient. Missing inputs
//! produce a record of explicit zeros at T6 so the packet's confidence
//! summary reflects the gap.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{ConfidenceScore, Tier};

/// Mitigation benefit-cost ratio used for framing.
pub const BCR_RATIO: f64 = 4.0;
/// Regional output multiplier applied to obligations.
pub const OUTPUT_MULTIPLIER: f64 = 1.9;
/// Supported jobs per $1M obligated.
pub const JOBS_PER_MILLION: f64 = 8.9;

/// Economic impact record for one Tribe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicImpact {
    pub total_obligation: f64,
    pub award_count: u64,
    /// "$X at 4:1 = $4X" framing line.
    pub bcr_framed: String,
    pub projected_local_spending: f64,
    pub projected_jobs: f64,
    /// One framing line per congressional district in the delegation.
    pub district_framing: Vec<String>,
    #[serde(rename = "_confidence")]
    pub confidence: ConfidenceScore,
}

impl EconomicImpact {
    /// Compute the record from cached award totals.
    pub fn compute(
        total_obligation: f64,
        award_count: u64,
        districts: &[String],
        award_tier: Tier,
        as_of: NaiveDate,
    ) -> Self {
        if total_obligation <= 0.0 || award_count == 0 {
            return Self::empty(as_of);
        }

        let benefits = total_obligation * BCR_RATIO;
        let projected_local_spending = total_obligation * OUTPUT_MULTIPLIER;
        let projected_jobs = total_obligation / 1_000_000.0 * JOBS_PER_MILLION;

        let district_framing = districts
            .iter()
            .map(|district| {
                format!(
                    "{}: {} in obligations supporting an estimated {:.0} jobs",
                    district,
                    dollars(total_obligation / districts.len().max(1) as f64),
                    projected_jobs / districts.len().max(1) as f64,
                )
            })
            .collect();

        Self {
            total_obligation,
            award_count,
            bcr_framed: format!(
                "{} at {BCR_RATIO:.0}:1 = {} in avoided losses",
                dollars(total_obligation),
                dollars(benefits)
            ),
            projected_local_spending,
            projected_jobs,
            district_framing,
            confidence: ConfidenceScore::tiered(award_tier, "award_cache", as_of),
        }
    }

    /// Explicit-zero record for Tribes with no populated award cache.
    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            total_obligation: 0.0,
            award_count: 0,
            bcr_framed: String::new(),
            projected_local_spending: 0.0,
            projected_jobs: 0.0,
            district_framing: Vec::new(),
            confidence: ConfidenceScore::placeholder("award_cache", as_of),
        }
    }
}

fn dollars(amount: f64) -> String {
    if amount >= 1_000_000.0 {
        format!("${:.1} million", amount / 1_000_000.0)
    } else {
        format!("${:.0}", amount)
    }
}
