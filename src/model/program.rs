//! The tracked-program inventory.
//!
//! Sixteen federal programs are tracked, loaded from
//! `program_inventory.json`. Each carries a static Confidence Index (CI): a
//! policy-risk score with a status bucket, curated out of band. The scanner
//! never mutates inventory entries; the Hot Sheets validator publishes an
//! [`EffectiveStatuses`] view that downstream consumers read instead.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// CI status bucket, ordered from safest to most endangered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CiStatus {
    Secure,
    Stable,
    StableButVulnerable,
    AtRisk,
    Uncertain,
    Flagged,
    Terminated,
}

impl std::fmt::Display for CiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CiStatus::Secure => "SECURE",
            CiStatus::Stable => "STABLE",
            CiStatus::StableButVulnerable => "STABLE_BUT_VULNERABLE",
            CiStatus::AtRisk => "AT_RISK",
            CiStatus::Uncertain => "UNCERTAIN",
            CiStatus::Flagged => "FLAGGED",
            CiStatus::Terminated => "TERMINATED",
        };
        write!(f, "{s}")
    }
}

/// Advocacy priority assigned to a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: critical first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// How the program's funding is appropriated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FundingType {
    Discretionary,
    Mandatory,
    Formula,
    TaxCredit,
}

/// How Tribes reach the program's funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Direct,
    SetAside,
    TribalSetAside,
    StatePassThrough,
}

impl AccessType {
    /// True for access paths where Tribes apply on their own behalf.
    pub fn is_direct_path(self) -> bool {
        matches!(
            self,
            AccessType::Direct | AccessType::SetAside | AccessType::TribalSetAside
        )
    }
}

/// Externally curated Hot Sheets position for a program. Ground truth that
/// overrides the scanner CI on divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotSheetsStatus {
    pub status: CiStatus,
    pub last_updated: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One tracked federal program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub agency: String,
    pub cfda: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Informal names the scorer also matches.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Static policy-risk score in [0, 1]. Distinct from data confidence.
    pub confidence_index: f64,
    pub ci_status: CiStatus,
    #[serde(default)]
    pub ci_determination: String,
    #[serde(default)]
    pub advocacy_lever: String,
    pub priority: Priority,
    pub funding_type: FundingType,
    pub access_type: Option<AccessType>,
    #[serde(default)]
    pub hot_sheets_status: Option<HotSheetsStatus>,
    /// Set for programs tracked ahead of an authorizing statute; exempt from
    /// the builder's authorization check.
    #[serde(default)]
    pub unauthorized_placeholder: bool,
}

/// The loaded inventory, indexed by id and CFDA.
#[derive(Debug, Clone, Default)]
pub struct ProgramInventory {
    programs: Vec<Program>,
    by_id: BTreeMap<String, usize>,
    by_cfda: BTreeMap<String, usize>,
}

impl ProgramInventory {
    /// Build an inventory from records, rejecting duplicate ids.
    pub fn from_programs(programs: Vec<Program>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        let mut by_cfda = BTreeMap::new();
        for (idx, program) in programs.iter().enumerate() {
            if by_id.insert(program.id.clone(), idx).is_some() {
                return Err(Error::config(format!(
                    "duplicate program id {:?} in inventory",
                    program.id
                )));
            }
            if let Some(cfda) = &program.cfda {
                by_cfda.insert(cfda.clone(), idx);
            }
        }
        Ok(Self {
            programs,
            by_id,
            by_cfda,
        })
    }

    /// Load the inventory from `program_inventory.json`. Fatal on missing or
    /// invalid content.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        let programs: Vec<Program> = serde_json::from_slice(&raw)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        Self::from_programs(programs)
    }

    pub fn get(&self, id: &str) -> Option<&Program> {
        self.by_id.get(id).map(|&idx| &self.programs[idx])
    }

    pub fn by_cfda(&self, cfda: &str) -> Option<&Program> {
        self.by_cfda.get(cfda).map(|&idx| &self.programs[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.programs.iter()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Program ids in inventory order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.programs.iter().map(|p| p.id.as_str())
    }
}

/// Effective CI for one program after Hot Sheets reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStatus {
    /// Status downstream consumers should act on.
    pub effective: CiStatus,
    /// Scanner status that was overridden, when Hot Sheets diverged.
    pub original: Option<CiStatus>,
}

/// Per-program effective CI view published by the Hot Sheets validator.
///
/// Programs without an entry keep their scanner status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStatuses {
    overrides: BTreeMap<String, EffectiveStatus>,
}

impl EffectiveStatuses {
    pub fn set(&mut self, program_id: impl Into<String>, status: EffectiveStatus) {
        self.overrides.insert(program_id.into(), status);
    }

    /// The status to act on for `program`.
    pub fn status_for(&self, program: &Program) -> CiStatus {
        self.overrides
            .get(&program.id)
            .map(|s| s.effective)
            .unwrap_or(program.ci_status)
    }

    /// The pre-override scanner status, when an override happened.
    pub fn original_for(&self, program_id: &str) -> Option<CiStatus> {
        self.overrides.get(program_id).and_then(|s| s.original)
    }

    pub fn is_overridden(&self, program_id: &str) -> bool {
        self.overrides
            .get(program_id)
            .is_some_and(|s| s.original.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EffectiveStatus)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A minimal inventory entry for tests.
#[cfg(test)]
pub(crate) fn sample_program(id: &str) -> Program {
    Program {
        id: id.to_string(),
        name: format!("Program {id}"),
        agency: "FEMA".to_string(),
        cfda: None,
        keywords: vec!["resilience".to_string()],
        aliases: Vec::new(),
        confidence_index: 0.5,
        ci_status: CiStatus::Stable,
        ci_determination: String::new(),
        advocacy_lever: String::new(),
        priority: Priority::Medium,
        funding_type: FundingType::Discretionary,
        access_type: Some(AccessType::Direct),
        hot_sheets_status: None,
        unauthorized_placeholder: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_status_serde_vocabulary() {
        let json = serde_json::to_string(&CiStatus::StableButVulnerable).unwrap();
        assert_eq!(json, "\"STABLE_BUT_VULNERABLE\"");
        let back: CiStatus = serde_json::from_str("\"AT_RISK\"").unwrap();
        assert_eq!(back, CiStatus::AtRisk);
    }

    #[test]
    fn test_funding_type_kebab_case() {
        let json = serde_json::to_string(&FundingType::TaxCredit).unwrap();
        assert_eq!(json, "\"tax-credit\"");
    }

    #[test]
    fn test_inventory_rejects_duplicate_ids() {
        let err = ProgramInventory::from_programs(vec![
            sample_program("fema_bric"),
            sample_program("fema_bric"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_inventory_cfda_lookup() {
        let mut p = sample_program("fema_bric");
        p.cfda = Some("97.047".to_string());
        let inventory = ProgramInventory::from_programs(vec![p]).unwrap();
        assert_eq!(inventory.by_cfda("97.047").unwrap().id, "fema_bric");
        assert!(inventory.by_cfda("10.000").is_none());
    }

    #[test]
    fn test_effective_statuses_fallback() {
        let program = sample_program("fema_bric");
        let mut view = EffectiveStatuses::default();
        assert_eq!(view.status_for(&program), CiStatus::Stable);

        view.set(
            "fema_bric",
            EffectiveStatus {
                effective: CiStatus::AtRisk,
                original: Some(CiStatus::Stable),
            },
        );
        assert_eq!(view.status_for(&program), CiStatus::AtRisk);
        assert_eq!(view.original_for("fema_bric"), Some(CiStatus::Stable));
        assert!(view.is_overridden("fema_bric"));
    }
}
