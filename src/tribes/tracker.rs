//! Per-Tribe packet snapshots and change detection.
//!
//! Each generated packet persists a compact snapshot at
//! `packet_state/<tribe_id>.json`. The next run diffs against it and reports
//! five change kinds: CI status changes, new awards, award-total movement,
//! advocacy-goal shifts, and new threats. Tribe ids are validated against
//! path traversal before any filesystem access.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decision::AdvocacyGoal;
use crate::error::{Error, Result};
use crate::model::CiStatus;
use crate::store;

/// Snapshot persisted after each packet build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketSnapshot {
    pub tribe_id: String,
    pub generated_at: DateTime<Utc>,
    /// Effective CI status per relevant program.
    pub program_states: BTreeMap<String, CiStatus>,
    pub total_awards: u64,
    pub total_obligation: f64,
    pub top_hazards: Vec<String>,
    pub advocacy_goal: Option<AdvocacyGoal>,
    /// Descriptions of active threats against relevant programs.
    #[serde(default)]
    pub active_threats: Vec<String>,
}

/// One observed difference between consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change_type", rename_all = "snake_case")]
pub enum PacketChange {
    CiStatusChange {
        program_id: String,
        from: CiStatus,
        to: CiStatus,
    },
    NewAward {
        count: u64,
    },
    AwardTotalChange {
        from: f64,
        to: f64,
    },
    AdvocacyGoalShift {
        from: Option<AdvocacyGoal>,
        to: Option<AdvocacyGoal>,
    },
    NewThreat {
        description: String,
    },
}

/// Reads and writes per-Tribe snapshots.
#[derive(Debug, Clone)]
pub struct PacketChangeTracker {
    state_dir: PathBuf,
}

impl PacketChangeTracker {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Previous snapshot for a Tribe, or `None` when absent or corrupt.
    pub fn load(&self, tribe_id: &str) -> Result<Option<PacketSnapshot>> {
        let path = self.state_path(tribe_id)?;
        match store::read_json_strict(&path) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                warn!(tribe_id, %err, "packet snapshot unreadable; treating as first run");
                Ok(None)
            }
        }
    }

    /// Persist the snapshot atomically.
    pub fn record(&self, snapshot: &PacketSnapshot) -> Result<()> {
        let path = self.state_path(&snapshot.tribe_id)?;
        store::write_json_atomic(&path, snapshot)
    }

    /// Compare consecutive snapshots. `prev = None` yields no changes: the
    /// first packet has nothing to diff against.
    pub fn diff(prev: Option<&PacketSnapshot>, current: &PacketSnapshot) -> Vec<PacketChange> {
        let Some(prev) = prev else {
            return Vec::new();
        };
        let mut changes = Vec::new();

        for (program_id, current_status) in &current.program_states {
            if let Some(prev_status) = prev.program_states.get(program_id) {
                if prev_status != current_status {
                    changes.push(PacketChange::CiStatusChange {
                        program_id: program_id.clone(),
                        from: *prev_status,
                        to: *current_status,
                    });
                }
            }
        }

        if current.total_awards > prev.total_awards {
            changes.push(PacketChange::NewAward {
                count: current.total_awards - prev.total_awards,
            });
        }
        if (current.total_obligation - prev.total_obligation).abs() > f64::EPSILON {
            changes.push(PacketChange::AwardTotalChange {
                from: prev.total_obligation,
                to: current.total_obligation,
            });
        }
        if current.advocacy_goal != prev.advocacy_goal {
            changes.push(PacketChange::AdvocacyGoalShift {
                from: prev.advocacy_goal,
                to: current.advocacy_goal,
            });
        }
        for threat in &current.active_threats {
            if !prev.active_threats.contains(threat) {
                changes.push(PacketChange::NewThreat {
                    description: threat.clone(),
                });
            }
        }

        changes
    }

    /// Resolve the state path, refusing traversal-shaped ids.
    fn state_path(&self, tribe_id: &str) -> Result<PathBuf> {
        if !is_safe_tribe_id(tribe_id) {
            return Err(Error::config(format!(
                "unsafe tribe id {tribe_id:?} for packet state"
            )));
        }
        Ok(self.state_dir.join(format!("{tribe_id}.json")))
    }
}

/// A tribe id is safe when it is its own path basename and carries no dots.
pub fn is_safe_tribe_id(tribe_id: &str) -> bool {
    if tribe_id.is_empty() || tribe_id.contains('.') {
        return false;
    }
    let basename = Path::new(tribe_id)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    basename.as_deref() == Some(tribe_id)
}
