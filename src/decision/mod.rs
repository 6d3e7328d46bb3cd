//! Advocacy-goal classification.
//!
//! The decision engine maps every tracked program to one of five advocacy
//! goals by evaluating a fixed priority chain of rules against the graph
//! state, the monitor alerts, and the effective CI view.

pub mod engine;

pub use engine::DecisionEngine;

use serde::{Deserialize, Serialize};

use crate::graph::EdgeMetadata;

/// The five advocacy goals, in rule-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvocacyGoal {
    UrgentStabilization,
    RestoreReplace,
    ProtectBase,
    DirectAccessParity,
    ExpandStrengthen,
}

impl AdvocacyGoal {
    /// Human-readable label for briefings and packets.
    pub fn label(self) -> &'static str {
        match self {
            AdvocacyGoal::UrgentStabilization => "Urgent Stabilization",
            AdvocacyGoal::RestoreReplace => "Restore / Replace",
            AdvocacyGoal::ProtectBase => "Protect the Base",
            AdvocacyGoal::DirectAccessParity => "Direct Access Parity",
            AdvocacyGoal::ExpandStrengthen => "Expand and Strengthen",
        }
    }
}

impl std::fmt::Display for AdvocacyGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdvocacyGoal::UrgentStabilization => "URGENT_STABILIZATION",
            AdvocacyGoal::RestoreReplace => "RESTORE_REPLACE",
            AdvocacyGoal::ProtectBase => "PROTECT_BASE",
            AdvocacyGoal::DirectAccessParity => "DIRECT_ACCESS_PARITY",
            AdvocacyGoal::ExpandStrengthen => "EXPAND_STRENGTHEN",
        };
        write!(f, "{s}")
    }
}

/// Classifier confidence in a rule outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleConfidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for RuleConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleConfidence::High => write!(f, "HIGH"),
            RuleConfidence::Medium => write!(f, "MEDIUM"),
            RuleConfidence::Low => write!(f, "LOW"),
        }
    }
}

/// Outcome for one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub advocacy_goal: Option<AdvocacyGoal>,
    pub goal_label: Option<String>,
    /// Id of the winning rule (e.g. "LOGIC-05"); absent when nothing matched.
    pub rule: Option<String>,
    pub confidence: RuleConfidence,
    pub reason: String,
    /// Rules that also matched but were outranked.
    pub secondary_rules: Vec<String>,
    /// THREATENS payload behind an urgent-stabilization call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_metadata: Option<EdgeMetadata>,
}

impl Classification {
    /// The no-match fallback.
    pub fn unmatched() -> Self {
        Self {
            advocacy_goal: None,
            goal_label: None,
            rule: None,
            confidence: RuleConfidence::Low,
            reason: "No decision rule matched".to_string(),
            secondary_rules: Vec::new(),
            threat_metadata: None,
        }
    }
}
