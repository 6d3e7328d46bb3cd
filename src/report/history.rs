//! Append-only, capped CI history.
//!
//! One entry per scan timestamp, each carrying the per-program CI value and
//! status bucket. A second render within the same timestamp does not append
//! a duplicate; the list never exceeds the configured cap (oldest entries
//! fall off the front).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CiStatus, EffectiveStatuses, ProgramInventory};
use crate::store;

/// Per-program CI at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiSnapshot {
    pub ci: f64,
    pub status: CiStatus,
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub programs: BTreeMap<String, CiSnapshot>,
}

/// The persisted history file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiHistory {
    #[serde(default)]
    pub entries: Vec<CiHistoryEntry>,
}

impl CiHistory {
    pub fn load(path: &Path) -> Self {
        store::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::write_json_atomic(path, self)
    }

    /// Append a snapshot of the current effective CI, idempotently per
    /// timestamp, and enforce the cap.
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        inventory: &ProgramInventory,
        effective: &EffectiveStatuses,
        cap: usize,
    ) {
        if self.entries.last().is_some_and(|e| e.timestamp == timestamp) {
            return;
        }

        let programs = inventory
            .iter()
            .map(|program| {
                (
                    program.id.clone(),
                    CiSnapshot {
                        ci: program.confidence_index,
                        status: effective.status_for(program),
                    },
                )
            })
            .collect();
        self.entries.push(CiHistoryEntry {
            timestamp,
            programs,
        });

        if self.entries.len() > cap {
            let excess = self.entries.len() - cap;
            self.entries.drain(..excess);
        }
    }

    /// The last `window` entries, oldest first.
    pub fn window(&self, window: usize) -> &[CiHistoryEntry] {
        let start = self.entries.len().saturating_sub(window);
        &self.entries[start..]
    }

    /// CI movement for one program across a window: (first, last).
    pub fn movement(&self, program_id: &str, window: usize) -> Option<(f64, f64)> {
        let entries = self.window(window);
        let values: Vec<f64> = entries
            .iter()
            .filter_map(|e| e.programs.get(program_id).map(|s| s.ci))
            .collect();
        match (values.first(), values.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }
}
