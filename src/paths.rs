//! Process-wide registry of well-known file locations.
//!
//! Constructed once at startup from a base directory and threaded by
//! reference through the pipeline. Every cache, reference file, and output
//! artifact resolves through this table so nothing else in the crate touches
//! raw path literals.

use std::path::{Path, PathBuf};

/// Well-known file locations for a scanner installation.
///
/// All paths are absolute once constructed. Tilde prefixes in the base
/// directory are expanded.
#[derive(Debug, Clone)]
pub struct PathRegistry {
    base: PathBuf,
}

impl PathRegistry {
    /// Create a registry rooted at `base`, expanding a leading `~`.
    pub fn new(base: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(base.as_ref()).into_owned();
        Self {
            base: PathBuf::from(expanded),
        }
    }

    /// Create a registry rooted at an already-resolved path.
    pub fn from_path(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory of the installation.
    pub fn base(&self) -> &Path {
        &self.base
    }

    // ---- configuration and reference data ----

    pub fn scanner_config(&self) -> PathBuf {
        self.base.join("scanner_config.json")
    }

    pub fn program_inventory(&self) -> PathBuf {
        self.base.join("program_inventory.json")
    }

    pub fn graph_schema(&self) -> PathBuf {
        self.base.join("graph_schema.json")
    }

    pub fn tribal_registry(&self) -> PathBuf {
        self.base.join("tribal_registry.json")
    }

    pub fn congressional_cache(&self) -> PathBuf {
        self.base.join("congressional_cache.json")
    }

    pub fn ecoregion_config(&self) -> PathBuf {
        self.base.join("ecoregion_config.json")
    }

    // ---- mutable state (the only files the pipeline rewrites) ----

    pub fn change_snapshot(&self) -> PathBuf {
        self.base.join(".scan_snapshot.json")
    }

    pub fn monitor_state(&self) -> PathBuf {
        self.base.join(".monitor_state.json")
    }

    pub fn ci_history(&self) -> PathBuf {
        self.base.join(".ci_history.json")
    }

    pub fn cfda_tracker(&self) -> PathBuf {
        self.base.join(".cfda_tracker.json")
    }

    // ---- per-tribe caches ----

    pub fn award_cache_dir(&self) -> PathBuf {
        self.base.join("award_cache")
    }

    pub fn award_cache(&self, tribe_id: &str) -> PathBuf {
        self.award_cache_dir().join(format!("{tribe_id}.json"))
    }

    pub fn hazard_profile_dir(&self) -> PathBuf {
        self.base.join("hazard_profiles")
    }

    pub fn hazard_profile(&self, tribe_id: &str) -> PathBuf {
        self.hazard_profile_dir().join(format!("{tribe_id}.json"))
    }

    pub fn packet_state_dir(&self) -> PathBuf {
        self.base.join("packet_state")
    }

    pub fn packet_output_dir(&self) -> PathBuf {
        self.base.join("packets")
    }

    // ---- outbound artifacts ----

    pub fn briefing(&self) -> PathBuf {
        self.base.join("LATEST-BRIEFING.md")
    }

    pub fn results_json(&self) -> PathBuf {
        self.base.join("LATEST-RESULTS.json")
    }

    pub fn graph_json(&self) -> PathBuf {
        self.base.join("LATEST-GRAPH.json")
    }

    pub fn monitor_data_json(&self) -> PathBuf {
        self.base.join("LATEST-MONITOR-DATA.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_base() {
        let paths = PathRegistry::from_path("/srv/scanner");
        assert_eq!(
            paths.monitor_state(),
            PathBuf::from("/srv/scanner/.monitor_state.json")
        );
        assert_eq!(
            paths.award_cache("epa_001"),
            PathBuf::from("/srv/scanner/award_cache/epa_001.json")
        );
        assert_eq!(
            paths.briefing(),
            PathBuf::from("/srv/scanner/LATEST-BRIEFING.md")
        );
    }

    #[test]
    fn test_tilde_expansion() {
        let paths = PathRegistry::new("~/scanner");
        assert!(!paths.base().to_string_lossy().starts_with('~'));
    }
}
