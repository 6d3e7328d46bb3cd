//! Scanner configuration.
//!
//! `scanner_config.json` is parsed once at startup into [`ScannerConfig`],
//! with defaults materialized at parse time. The rest of the crate consumes
//! the struct by reference; nothing re-reads the file or probes for optional
//! keys at runtime. Invalid configuration is fatal.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Top-level configuration for a scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Adapter fetch window, in days.
    pub scan_window_days: u32,
    pub relevance: RelevanceConfig,
    pub monitors: MonitorsConfig,
    pub reporter: ReporterConfig,
    pub packets: PacketsConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_window_days: 14,
            relevance: RelevanceConfig::default(),
            monitors: MonitorsConfig::default(),
            reporter: ReporterConfig::default(),
            packets: PacketsConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Load and validate configuration from `path`. A missing file yields the
    /// full defaults; an unreadable or invalid file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = match std::fs::read(path) {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(Error::config(format!("read {}: {e}", path.display()))),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the type system cannot.
    pub fn validate(&self) -> Result<()> {
        let weights = &self.relevance.weights;
        let sum = weights.keyword_density
            + weights.cfda_match
            + weights.agency_co_occurrence
            + weights.program_name_mention
            + weights.temporal_freshness;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::config(format!(
                "relevance weights must sum to 1.0, got {sum}"
            )));
        }
        for (name, value) in [
            ("relevance.threshold", self.relevance.threshold),
            ("relevance.match_threshold", self.relevance.match_threshold),
            ("reporter.delta_threshold", self.reporter.delta_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if self.reporter.ci_history_cap == 0 {
            return Err(Error::config("reporter.ci_history_cap must be at least 1"));
        }
        if self.reporter.trend_window == 0 {
            return Err(Error::config("reporter.trend_window must be at least 1"));
        }
        if self.packets.max_relevant_programs == 0 {
            return Err(Error::config("packets.max_relevant_programs must be at least 1"));
        }
        Ok(())
    }
}

/// Relevance scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Items scoring below this are dropped from the scan.
    pub threshold: f64,
    /// Per-program signal score needed to count as a program match.
    pub match_threshold: f64,
    pub weights: RelevanceWeights,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            match_threshold: 0.4,
            weights: RelevanceWeights::default(),
        }
    }
}

/// Weights for the five relevance factors. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceWeights {
    pub keyword_density: f64,
    pub cfda_match: f64,
    pub agency_co_occurrence: f64,
    pub program_name_mention: f64,
    pub temporal_freshness: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            keyword_density: 0.30,
            cfda_match: 0.25,
            agency_co_occurrence: 0.15,
            program_name_mention: 0.20,
            temporal_freshness: 0.10,
        }
    }
}

/// Per-monitor configuration blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorsConfig {
    pub iija_sunset: IijaSunsetConfig,
    pub reconciliation: ReconciliationConfig,
    pub dhs_funding: DhsFundingConfig,
    pub hot_sheets: HotSheetsConfig,
    pub tribal_consultation: ConsultationConfig,
    pub decision_engine: DecisionEngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IijaSunsetConfig {
    pub warning_days: i64,
    pub critical_days: i64,
    /// End of FY26: statutory sunset for IIJA supplemental funding.
    pub fy26_end: NaiveDate,
}

impl Default for IijaSunsetConfig {
    fn default() -> Self {
        Self {
            warning_days: 180,
            critical_days: 90,
            fy26_end: NaiveDate::from_ymd_opt(2026, 9, 30).expect("valid date"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub keywords: Vec<String>,
    pub active_bill_statuses: Vec<String>,
    /// Laws already enacted; bills citing them are not live threats.
    pub enacted_laws_exclude: Vec<String>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "reconciliation",
                "budget resolution",
                "rescission",
                "rescind unobligated",
                "clawback",
                "repeal of the infrastructure",
            ]
            .map(String::from)
            .to_vec(),
            active_bill_statuses: ["introduced", "committee", "floor", "conference"]
                .map(String::from)
                .to_vec(),
            enacted_laws_exclude: vec!["Public Law 119-21".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DhsFundingConfig {
    /// Continuing-resolution expiration the cliff counts down to.
    pub cr_expiration: NaiveDate,
    /// Programs exposed to the cliff.
    pub fema_program_ids: Vec<String>,
    pub warning_days: i64,
}

impl Default for DhsFundingConfig {
    fn default() -> Self {
        Self {
            cr_expiration: NaiveDate::from_ymd_opt(2026, 1, 30).expect("valid date"),
            fema_program_ids: vec![
                "fema_bric".to_string(),
                "fema_tribal_mitigation".to_string(),
            ],
            warning_days: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotSheetsConfig {
    /// Age beyond which a Hot Sheets position is flagged stale, in days.
    pub staleness_days: i64,
}

impl Default for HotSheetsConfig {
    fn default() -> Self {
        Self { staleness_days: 90 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultationConfig {
    pub keywords: Vec<String>,
    /// Agencies whose consultation notices are tracked.
    pub agency_slugs: Vec<String>,
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "tribal consultation",
                "government-to-government",
                "listening session",
            ]
            .map(String::from)
            .to_vec(),
            agency_slugs: [
                "interior-department",
                "environmental-protection-agency",
                "homeland-security-department",
                "agriculture-department",
                "energy-department",
                "commerce-department",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionEngineConfig {
    /// THREATENS edges within this many days force urgent stabilization.
    pub urgency_threshold_days: i64,
}

impl Default for DecisionEngineConfig {
    fn default() -> Self {
        Self {
            urgency_threshold_days: 30,
        }
    }
}

/// Reporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub ci_history_cap: usize,
    pub delta_threshold: f64,
    pub trend_window: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            ci_history_cap: 90,
            delta_threshold: 0.02,
            trend_window: 10,
        }
    }
}

/// Per-Tribe packet generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketsConfig {
    /// Override for the packet output directory.
    pub output_dir: Option<String>,
    /// Override for the packet state directory.
    pub state_dir: Option<String>,
    pub max_relevant_programs: usize,
}

impl Default for PacketsConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            state_dir: None,
            max_relevant_programs: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        ScannerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ScannerConfig::load(&dir.path().join("scanner_config.json")).unwrap();
        assert_eq!(config.scan_window_days, 14);
        assert_eq!(config.reporter.ci_history_cap, 90);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanner_config.json");
        std::fs::write(&path, r#"{"scan_window_days": 30}"#).unwrap();

        let config = ScannerConfig::load(&path).unwrap();
        assert_eq!(config.scan_window_days, 30);
        assert_eq!(config.relevance.threshold, 0.3);
        assert_eq!(config.monitors.decision_engine.urgency_threshold_days, 30);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanner_config.json");
        std::fs::write(&path, b"{oops").unwrap();
        assert!(matches!(ScannerConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = ScannerConfig::default();
        config.relevance.weights.keyword_density = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_threshold_bounds_checked() {
        let mut config = ScannerConfig::default();
        config.relevance.threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
