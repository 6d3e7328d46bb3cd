//! Congressional delegation mapping.
//!
//! Delegations come from `congressional_cache.json`: the member roster with
//! committee memberships, plus the Census AIANNH-to-district crosswalk. An
//! offline build script regenerates the cache; the mapper only joins it.
//! Crosswalk matching runs in four tiers (exact, variant, substring, fuzzy);
//! entities that match nothing are logged and skipped, never fatal.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::tribes::registry::Tribe;

/// Fuzzy floor for crosswalk matching, stricter than registry resolution.
pub const CROSSWALK_FUZZY_THRESHOLD: u8 = 80;

/// District code used for at-large representatives.
pub const AT_LARGE_DISTRICT: &str = "AL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chamber {
    Senate,
    House,
}

/// A member of Congress from the cached roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legislator {
    pub bioguide: String,
    pub name: String,
    pub party: Option<String>,
    pub state: String,
    /// District number as a string, or "AL" for at-large. Absent for
    /// senators.
    pub district: Option<String>,
    pub chamber: Chamber,
}

/// One AIANNH crosswalk row: an entity name and the district it overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkEntry {
    pub aiannh_name: String,
    #[serde(default)]
    pub variants: Vec<String>,
    pub state: String,
    pub district: String,
}

/// The cached roster + committees + crosswalk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongressionalCache {
    pub members: Vec<Legislator>,
    /// Committee names keyed by member bioguide.
    pub committees: HashMap<String, Vec<String>>,
    pub crosswalk: Vec<CrosswalkEntry>,
}

/// A Tribe's delegation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CongressionalDelegation {
    pub senators: Vec<Legislator>,
    pub representatives: Vec<Legislator>,
    /// Committee memberships across the delegation, deduplicated.
    pub committees: Vec<String>,
}

impl CongressionalDelegation {
    pub fn is_empty(&self) -> bool {
        self.senators.is_empty() && self.representatives.is_empty()
    }
}

/// Joins Tribes to their delegations.
#[derive(Debug, Clone)]
pub struct CongressionalMapper {
    cache: CongressionalCache,
}

impl CongressionalMapper {
    pub fn new(cache: CongressionalCache) -> Self {
        Self { cache }
    }

    /// Load the cache. Missing or invalid content is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        let cache: CongressionalCache = serde_json::from_slice(&raw)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        Ok(Self::new(cache))
    }

    /// Compute the delegation for one Tribe.
    ///
    /// Senators come from the Tribe's states (deduplicated by bioguide);
    /// representatives come from the crosswalk districts. A Tribe absent
    /// from the crosswalk keeps its senators and gets a warning, not an
    /// error.
    pub fn delegation_for(&self, tribe: &Tribe) -> CongressionalDelegation {
        let mut senators: Vec<Legislator> = Vec::new();
        let mut seen_bioguides: BTreeSet<String> = BTreeSet::new();
        for member in &self.cache.members {
            if member.chamber == Chamber::Senate
                && tribe.states.contains(&member.state)
                && seen_bioguides.insert(member.bioguide.clone())
            {
                senators.push(member.clone());
            }
        }

        let districts = self.matched_districts(tribe);
        if districts.is_empty() {
            warn!(tribe = %tribe.name, "no AIANNH crosswalk match; delegation has senators only");
        }

        let mut representatives: Vec<Legislator> = Vec::new();
        for (state, district) in &districts {
            for member in &self.cache.members {
                if member.chamber == Chamber::House
                    && member.state == *state
                    && member.district.as_deref() == Some(district.as_str())
                    && seen_bioguides.insert(member.bioguide.clone())
                {
                    representatives.push(member.clone());
                }
            }
        }

        let mut committees: BTreeSet<String> = BTreeSet::new();
        for member in senators.iter().chain(representatives.iter()) {
            if let Some(memberships) = self.cache.committees.get(&member.bioguide) {
                committees.extend(memberships.iter().cloned());
            }
        }

        CongressionalDelegation {
            senators,
            representatives,
            committees: committees.into_iter().collect(),
        }
    }

    /// Four-tier crosswalk match: exact, variant, substring, fuzzy.
    fn matched_districts(&self, tribe: &Tribe) -> BTreeSet<(String, String)> {
        let needle = tribe.name.to_lowercase();
        let mut districts = BTreeSet::new();

        for entry in &self.cache.crosswalk {
            let entry_name = entry.aiannh_name.to_lowercase();

            let exact = entry_name == needle;
            let variant = entry
                .variants
                .iter()
                .any(|v| v.to_lowercase() == needle)
                || tribe
                    .aliases
                    .iter()
                    .any(|a| a.to_lowercase() == entry_name);
            let substring =
                entry_name.contains(&needle) || needle.contains(&entry_name);
            let fuzzy = || {
                (strsim::jaro_winkler(&entry_name, &needle) * 100.0).round() as u8
                    >= CROSSWALK_FUZZY_THRESHOLD
            };

            if exact || variant || substring || fuzzy() {
                districts.insert((entry.state.clone(), entry.district.clone()));
            }
        }
        districts
    }
}
