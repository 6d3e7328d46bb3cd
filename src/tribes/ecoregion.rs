//! Ecoregion reference data.
//!
//! Seven regions cover the lower 48 plus Alaska and the islands. The config
//! also carries the baseline Tribal program set and the hazard-to-program map
//! the relevance filter consumes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// The expected region count.
pub const REGION_COUNT: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionDef {
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub priority_programs: Vec<String>,
}

/// `ecoregion_config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoregionConfig {
    pub regions: BTreeMap<String, RegionDef>,
    /// Programs every Tribe packet includes.
    pub baseline_programs: Vec<String>,
    /// Program ids keyed by hazard name.
    pub hazard_programs: BTreeMap<String, Vec<String>>,
}

/// State-to-region lookup with per-region priority programs.
#[derive(Debug, Clone, Default)]
pub struct EcoregionMapper {
    config: EcoregionConfig,
    state_to_region: BTreeMap<String, String>,
}

impl EcoregionMapper {
    pub fn new(config: EcoregionConfig) -> Self {
        if config.regions.len() != REGION_COUNT && !config.regions.is_empty() {
            warn!(
                regions = config.regions.len(),
                expected = REGION_COUNT,
                "ecoregion config does not carry the expected region count"
            );
        }
        let mut state_to_region = BTreeMap::new();
        for (region, def) in &config.regions {
            for state in &def.states {
                state_to_region.insert(state.clone(), region.clone());
            }
        }
        Self {
            config,
            state_to_region,
        }
    }

    /// Load the config. Missing or invalid content is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        let config: EcoregionConfig = serde_json::from_slice(&raw)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        Ok(Self::new(config))
    }

    pub fn region_for_state(&self, state: &str) -> Option<&str> {
        self.state_to_region.get(state).map(String::as_str)
    }

    /// Priority programs for a region, empty when unknown.
    pub fn priority_programs(&self, region: &str) -> &[String] {
        self.config
            .regions
            .get(region)
            .map(|def| def.priority_programs.as_slice())
            .unwrap_or(&[])
    }

    pub fn baseline_programs(&self) -> &[String] {
        &self.config.baseline_programs
    }

    /// Programs mapped to a hazard, empty when unknown.
    pub fn hazard_programs(&self, hazard: &str) -> &[String] {
        self.config
            .hazard_programs
            .get(hazard)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
pub(crate) fn sample_ecoregions() -> EcoregionMapper {
    let mut regions = BTreeMap::new();
    regions.insert(
        "pacific_northwest".to_string(),
        RegionDef {
            states: vec!["WA".to_string(), "OR".to_string(), "ID".to_string()],
            priority_programs: vec!["noaa_coastal".to_string(), "usda_wildfire".to_string()],
        },
    );
    regions.insert(
        "southwest".to_string(),
        RegionDef {
            states: vec!["AZ".to_string(), "NM".to_string(), "NV".to_string()],
            priority_programs: vec!["usbr_water".to_string()],
        },
    );
    let mut hazard_programs = BTreeMap::new();
    hazard_programs.insert(
        "wildfire".to_string(),
        vec!["usda_wildfire".to_string(), "fema_bric".to_string()],
    );
    hazard_programs.insert("drought".to_string(), vec!["usbr_water".to_string()]);
    hazard_programs.insert("flooding".to_string(), vec!["fema_bric".to_string()]);

    EcoregionMapper::new(EcoregionConfig {
        regions,
        baseline_programs: vec!["bia_tcr".to_string(), "fema_tribal_mitigation".to_string()],
        hazard_programs,
    })
}
