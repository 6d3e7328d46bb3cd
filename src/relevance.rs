//! Five-factor relevance scoring.
//!
//! Each scored item gets a relevance score in [0, 1] and a set of matched
//! program ids. The factors, weighted per config (weights sum to 1.0):
//!
//! 1. keyword hit density: fraction of a program's keywords in title+abstract
//! 2. CFDA exact match: item CFDA equals the program CFDA
//! 3. agency co-occurrence: program agency named in the item text
//! 4. program name mention: program name or alias in the item text
//! 5. temporal freshness: sigmoid decay on publication age
//!
//! The item's score is its best per-program score; items below the scan
//! threshold drop out. A program counts as matched on any nonzero CFDA factor
//! or when the keyword/name signal alone clears the match threshold.

use chrono::NaiveDate;

use crate::config::RelevanceConfig;
use crate::model::confidence::freshness_decay;
use crate::model::{Program, ProgramInventory, ScoredItem};

/// Per-program factor breakdown, exposed for tests and tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub keyword_density: f64,
    pub cfda_match: f64,
    pub agency_co_occurrence: f64,
    pub program_name_mention: f64,
    pub temporal_freshness: f64,
}

/// Scores items against the tracked-program inventory.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    config: RelevanceConfig,
    today: NaiveDate,
}

impl RelevanceScorer {
    pub fn new(config: RelevanceConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    /// Score a batch and drop items below the scan threshold.
    pub fn score_all(
        &self,
        items: Vec<ScoredItem>,
        inventory: &ProgramInventory,
    ) -> Vec<ScoredItem> {
        let mut retained = Vec::with_capacity(items.len());
        for mut item in items {
            self.score_item(&mut item, inventory);
            if item.score >= self.config.threshold {
                retained.push(item);
            }
        }
        retained
    }

    /// Assign `score` and `matched_programs` in place.
    pub fn score_item(&self, item: &mut ScoredItem, inventory: &ProgramInventory) {
        let text = item.search_text();
        let mut best = 0.0f64;

        item.matched_programs.clear();
        for program in inventory.iter() {
            let factors = self.factors(item, &text, program);
            let score = self.combine(&factors);
            best = best.max(score);

            if factors.cfda_match > 0.0 || self.signal_score(&factors) >= self.config.match_threshold
            {
                // BTreeSet keeps the match set alphabetical, which is the
                // documented tie-break order.
                item.matched_programs.insert(program.id.clone());
            }
        }

        item.score = best.clamp(0.0, 1.0);
    }

    /// Raw factor values for one item against one program.
    pub fn factors(&self, item: &ScoredItem, text: &str, program: &Program) -> FactorScores {
        let keyword_density = if program.keywords.is_empty() {
            0.0
        } else {
            let hits = program
                .keywords
                .iter()
                .filter(|kw| text.contains(&kw.to_lowercase()))
                .count();
            hits as f64 / program.keywords.len() as f64
        };

        let cfda_match = match (&item.cfda, &program.cfda) {
            (Some(a), Some(b)) if a == b => 1.0,
            _ => 0.0,
        };

        let agency_co_occurrence = if program.agency.is_empty() {
            0.0
        } else if text.contains(&program.agency.to_lowercase()) {
            1.0
        } else {
            0.0
        };

        let name_hit = text.contains(&program.name.to_lowercase())
            || program
                .aliases
                .iter()
                .any(|alias| text.contains(&alias.to_lowercase()));
        let program_name_mention = if name_hit { 1.0 } else { 0.0 };

        FactorScores {
            keyword_density,
            cfda_match,
            agency_co_occurrence,
            program_name_mention,
            temporal_freshness: freshness_decay(item.published_at, self.today),
        }
    }

    fn combine(&self, factors: &FactorScores) -> f64 {
        let w = &self.config.weights;
        w.keyword_density * factors.keyword_density
            + w.cfda_match * factors.cfda_match
            + w.agency_co_occurrence * factors.agency_co_occurrence
            + w.program_name_mention * factors.program_name_mention
            + w.temporal_freshness * factors.temporal_freshness
    }

    /// Keyword/name evidence alone, renormalized to [0, 1]. This is what a
    /// program match requires when there is no CFDA link.
    fn signal_score(&self, factors: &FactorScores) -> f64 {
        let w = &self.config.weights;
        let signal_weight = w.keyword_density + w.program_name_mention;
        if signal_weight <= 0.0 {
            return 0.0;
        }
        (w.keyword_density * factors.keyword_density
            + w.program_name_mention * factors.program_name_mention)
            / signal_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::program::sample_program;
    use crate::model::{ConfidenceScore, Source, Tier};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(title: &str, abstract_text: &str) -> ScoredItem {
        let published = day(2026, 1, 8);
        ScoredItem {
            source: Source::Legislative,
            source_id: "hr119-1".to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            url: String::new(),
            published_at: Some(published),
            action_text: None,
            score: 0.0,
            matched_programs: Default::default(),
            cfda: None,
            extras: Default::default(),
            confidence: ConfidenceScore::tiered(Tier::T1, "legislative", published),
        }
    }

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(RelevanceConfig::default(), day(2026, 1, 10))
    }

    fn inventory() -> ProgramInventory {
        let mut bric = sample_program("fema_bric");
        bric.name = "Building Resilient Infrastructure and Communities".to_string();
        bric.aliases = vec!["BRIC".to_string()];
        bric.cfda = Some("97.047".to_string());
        bric.keywords = vec![
            "hazard mitigation".to_string(),
            "resilience".to_string(),
            "pre-disaster".to_string(),
        ];

        let mut stag = sample_program("epa_stag");
        stag.name = "State and Tribal Assistance Grants".to_string();
        stag.agency = "EPA".to_string();
        stag.cfda = Some("66.468".to_string());
        stag.keywords = vec!["drinking water".to_string(), "wastewater".to_string()];

        ProgramInventory::from_programs(vec![bric, stag]).unwrap()
    }

    #[test]
    fn test_cfda_match_forces_program_match() {
        let mut it = item("Quarterly award report", "");
        it.cfda = Some("97.047".to_string());
        scorer().score_item(&mut it, &inventory());
        assert!(it.matched_programs.contains("fema_bric"));
        assert!(!it.matched_programs.contains("epa_stag"));
    }

    #[test]
    fn test_name_and_keywords_match_without_cfda() {
        let mut it = item(
            "BRIC hazard mitigation funding notice",
            "Pre-disaster resilience investments for communities.",
        );
        scorer().score_item(&mut it, &inventory());
        assert!(it.matched_programs.contains("fema_bric"));
        assert!(it.score > 0.3);
    }

    #[test]
    fn test_unrelated_item_scores_low() {
        let mut it = item("Postal facility naming", "Designates a post office.");
        scorer().score_item(&mut it, &inventory());
        assert!(it.matched_programs.is_empty());
        assert!(it.score < 0.3);
    }

    #[test]
    fn test_threshold_drops_items() {
        let items = vec![
            item("Postal facility naming", "Designates a post office."),
            item(
                "BRIC hazard mitigation resilience grants",
                "Pre-disaster mitigation for tribal communities.",
            ),
        ];
        let kept = scorer().score_all(items, &inventory());
        assert_eq!(kept.len(), 1);
        assert!(kept[0].title.contains("BRIC"));
    }

    #[test]
    fn test_matched_programs_are_alphabetical() {
        let mut it = item(
            "BRIC resilience and State and Tribal Assistance Grants drinking water package",
            "hazard mitigation pre-disaster wastewater",
        );
        scorer().score_item(&mut it, &inventory());
        let ids: Vec<&str> = it.matched_programs.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["epa_stag", "fema_bric"]);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let mut a = item("BRIC hazard mitigation", "resilience");
        let mut b = a.clone();
        scorer().score_item(&mut a, &inventory());
        scorer().score_item(&mut b, &inventory());
        assert_eq!(a, b);
    }
}
