//! Registry of the 592 federally recognized Tribal Nations.
//!
//! Loaded from `tribal_registry.json` (reference data, regenerated offline).
//! Resolution runs in three tiers: exact name or alias, substring, then a
//! fuzzy scorer tuned for short queries against long official names.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default fuzzy-match floor on the 0–100 scale.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 60;

/// One federally recognized Tribal Nation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tribe {
    pub tribe_id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Two-letter state codes the Nation's lands touch.
    #[serde(default)]
    pub states: BTreeSet<String>,
    #[serde(default)]
    pub ecoregion: String,
    pub bia_code: Option<String>,
}

/// Outcome of a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A single record matched the query exactly.
    Exact(Tribe),
    /// The query appeared as a substring of one or more official names.
    Substring(Vec<Tribe>),
    /// Best fuzzy candidates at or above the threshold, best first.
    Fuzzy(Vec<(Tribe, u8)>),
}

/// The loaded registry.
#[derive(Debug, Clone, Default)]
pub struct TribalRegistry {
    tribes: Vec<Tribe>,
    by_id: HashMap<String, usize>,
}

impl TribalRegistry {
    pub fn from_tribes(tribes: Vec<Tribe>) -> Result<Self> {
        let mut by_id = HashMap::new();
        for (idx, tribe) in tribes.iter().enumerate() {
            if by_id.insert(tribe.tribe_id.clone(), idx).is_some() {
                return Err(Error::config(format!(
                    "duplicate tribe id {:?} in registry",
                    tribe.tribe_id
                )));
            }
        }
        Ok(Self { tribes, by_id })
    }

    /// Load the registry. Missing or invalid content is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        let tribes: Vec<Tribe> = serde_json::from_slice(&raw)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        Self::from_tribes(tribes)
    }

    pub fn get_by_id(&self, tribe_id: &str) -> Option<&Tribe> {
        self.by_id.get(tribe_id).map(|&idx| &self.tribes[idx])
    }

    pub fn get_all(&self) -> &[Tribe] {
        &self.tribes
    }

    pub fn len(&self) -> usize {
        self.tribes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tribes.is_empty()
    }

    /// Resolve a free-form query against the registry.
    ///
    /// Returns [`Error::Resolution`] when nothing clears the fuzzy threshold,
    /// which the CLI surfaces as exit code 2.
    pub fn resolve(&self, query: &str) -> Result<Resolution> {
        self.resolve_with_threshold(query, DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn resolve_with_threshold(&self, query: &str, threshold: u8) -> Result<Resolution> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::Resolution {
                query: query.to_string(),
            });
        }

        // Tier 1: exact official name or alias.
        for tribe in &self.tribes {
            let exact = tribe.name.to_lowercase() == needle
                || tribe.aliases.iter().any(|a| a.to_lowercase() == needle);
            if exact {
                return Ok(Resolution::Exact(tribe.clone()));
            }
        }

        // Tier 2: substring of the official name or an alias.
        let substring: Vec<Tribe> = self
            .tribes
            .iter()
            .filter(|tribe| {
                tribe.name.to_lowercase().contains(&needle)
                    || tribe.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        if !substring.is_empty() {
            return Ok(Resolution::Substring(substring));
        }

        // Tier 3: fuzzy candidates.
        let mut scored: Vec<(Tribe, u8)> = self
            .tribes
            .iter()
            .map(|tribe| (tribe.clone(), fuzzy_score(&needle, tribe)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.tribe_id.cmp(&b.0.tribe_id)));

        if scored.is_empty() {
            return Err(Error::Resolution {
                query: query.to_string(),
            });
        }
        Ok(Resolution::Fuzzy(scored))
    }
}

/// Token-level fuzzy score on the 0–100 scale.
///
/// Short queries against long official names punish whole-string edit
/// distance, so each query token is scored against its best-matching name
/// token instead, and the mean is reported.
pub fn fuzzy_score(query: &str, tribe: &Tribe) -> u8 {
    let candidates: Vec<String> = std::iter::once(tribe.name.clone())
        .chain(tribe.aliases.iter().cloned())
        .collect();
    let best = candidates
        .iter()
        .map(|candidate| token_score(query, &candidate.to_lowercase()))
        .fold(0.0f64, f64::max);
    (best * 100.0).round() as u8
}

fn token_score(query: &str, name: &str) -> f64 {
    let query_tokens = tokens(query);
    let name_tokens = tokens(name);
    if query_tokens.is_empty() || name_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = query_tokens
        .iter()
        .map(|qt| {
            name_tokens
                .iter()
                .map(|nt| strsim::jaro_winkler(qt, nt))
                .fold(0.0f64, f64::max)
        })
        .sum();
    total / query_tokens.len() as f64
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A minimal registry record for tests.
#[cfg(test)]
pub(crate) fn sample_tribe(id: &str, name: &str, aliases: &[&str], states: &[&str]) -> Tribe {
    Tribe {
        tribe_id: id.to_string(),
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        states: states.iter().map(|s| s.to_string()).collect(),
        ecoregion: "pacific_northwest".to_string(),
        bia_code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tribe(id: &str, name: &str, aliases: &[&str], states: &[&str]) -> Tribe {
        sample_tribe(id, name, aliases, states)
    }

    fn registry() -> TribalRegistry {
        TribalRegistry::from_tribes(vec![
            tribe(
                "quinault",
                "Quinault Indian Nation",
                &["Quinault"],
                &["WA"],
            ),
            tribe(
                "hoopa",
                "Hoopa Valley Tribe, California",
                &["Hoopa Valley"],
                &["CA"],
            ),
            tribe(
                "navajo",
                "Navajo Nation, Arizona, New Mexico & Utah",
                &["Navajo"],
                &["AZ", "NM", "UT"],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_resolution_for_every_official_name() {
        let registry = registry();
        for tribe in registry.get_all() {
            match registry.resolve(&tribe.name).unwrap() {
                Resolution::Exact(found) => assert_eq!(found.tribe_id, tribe.tribe_id),
                other => panic!("expected exact match for {:?}, got {other:?}", tribe.name),
            }
        }
    }

    #[test]
    fn test_exact_is_case_insensitive() {
        match registry().resolve("quinault indian nation").unwrap() {
            Resolution::Exact(found) => assert_eq!(found.tribe_id, "quinault"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_substring_resolution() {
        match registry().resolve("Valley").unwrap() {
            Resolution::Substring(found) => {
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].tribe_id, "hoopa");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fuzzy_resolution_for_misspelling() {
        match registry().resolve("Navaho Nation").unwrap() {
            Resolution::Fuzzy(found) => assert_eq!(found[0].0.tribe_id, "navajo"),
            // A close misspelling may still hit the substring tier through an
            // alias; either way the right record surfaces.
            Resolution::Substring(found) => assert_eq!(found[0].tribe_id, "navajo"),
            Resolution::Exact(found) => assert_eq!(found.tribe_id, "navajo"),
        }
    }

    #[test]
    fn test_no_candidates_is_resolution_error() {
        let err = registry().resolve("zzzz qqqq xxxx").unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = TribalRegistry::from_tribes(vec![
            tribe("dup", "First", &[], &["WA"]),
            tribe("dup", "Second", &[], &["OR"]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
