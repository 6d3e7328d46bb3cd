//! Per-Tribe program relevance filtering.
//!
//! Each Tribe's packet covers 8–12 of the 16 tracked programs: the baseline
//! Tribal set, programs mapped to the Tribe's top hazards, and the
//! ecoregion's priority programs, padded from the remaining inventory when
//! thin and capped at the configured maximum. Ordering is deterministic:
//! program priority rank, then id.

use std::collections::BTreeSet;

use crate::model::ProgramInventory;
use crate::tribes::ecoregion::EcoregionMapper;
use crate::tribes::registry::Tribe;

/// Lower bound the filter pads toward.
pub const MIN_RELEVANT_PROGRAMS: usize = 8;

/// Selects the relevant-program set for a Tribe.
#[derive(Debug, Clone)]
pub struct ProgramRelevanceFilter {
    max_programs: usize,
}

impl ProgramRelevanceFilter {
    pub fn new(max_programs: usize) -> Self {
        Self { max_programs }
    }

    /// The relevant-program ids for `tribe`, ordered by priority then id.
    pub fn select(
        &self,
        tribe: &Tribe,
        top_hazards: &[String],
        inventory: &ProgramInventory,
        ecoregions: &EcoregionMapper,
    ) -> Vec<String> {
        let mut selected: BTreeSet<String> = BTreeSet::new();

        // (a) baseline Tribal programs.
        for id in ecoregions.baseline_programs() {
            if inventory.get(id).is_some() {
                selected.insert(id.clone());
            }
        }

        // (b) hazard-mapped programs for the Tribe's top hazards.
        for hazard in top_hazards {
            for id in ecoregions.hazard_programs(hazard) {
                if inventory.get(id).is_some() {
                    selected.insert(id.clone());
                }
            }
        }

        // (c) ecoregion priority programs.
        let region = tribe
            .states
            .iter()
            .find_map(|state| ecoregions.region_for_state(state))
            .unwrap_or(tribe.ecoregion.as_str());
        for id in ecoregions.priority_programs(region) {
            if inventory.get(id).is_some() {
                selected.insert(id.clone());
            }
        }

        let mut ordered = self.order(selected, inventory);

        // Pad from the remaining inventory when under the floor.
        if ordered.len() < MIN_RELEVANT_PROGRAMS {
            let chosen: BTreeSet<String> = ordered.iter().cloned().collect();
            let mut remainder: Vec<String> = inventory
                .ids()
                .filter(|id| !chosen.contains(*id))
                .map(str::to_string)
                .collect();
            remainder.sort_by_key(|id| self.sort_key(id, inventory));
            for id in remainder {
                if ordered.len() >= MIN_RELEVANT_PROGRAMS {
                    break;
                }
                ordered.push(id);
            }
        }

        ordered.truncate(self.max_programs);
        ordered
    }

    fn order(&self, selected: BTreeSet<String>, inventory: &ProgramInventory) -> Vec<String> {
        let mut ordered: Vec<String> = selected.into_iter().collect();
        ordered.sort_by_key(|id| self.sort_key(id, inventory));
        ordered
    }

    fn sort_key(&self, id: &str, inventory: &ProgramInventory) -> (u8, String) {
        let rank = inventory.get(id).map(|p| p.priority.rank()).unwrap_or(u8::MAX);
        (rank, id.to_string())
    }
}
