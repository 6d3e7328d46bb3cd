//! Graph edge types and per-type metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Directed relationship vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    AuthorizedBy,
    FundedBy,
    BlockedBy,
    MitigatedBy,
    ObligatedBy,
    Advances,
    TrustObligation,
    Threatens,
    RepresentedBy,
    InEcoregion,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeType::AuthorizedBy => "AUTHORIZED_BY",
            EdgeType::FundedBy => "FUNDED_BY",
            EdgeType::BlockedBy => "BLOCKED_BY",
            EdgeType::MitigatedBy => "MITIGATED_BY",
            EdgeType::ObligatedBy => "OBLIGATED_BY",
            EdgeType::Advances => "ADVANCES",
            EdgeType::TrustObligation => "TRUST_OBLIGATION",
            EdgeType::Threatens => "THREATENS",
            EdgeType::RepresentedBy => "REPRESENTED_BY",
            EdgeType::InEcoregion => "IN_ECOREGION",
        };
        write!(f, "{s}")
    }
}

/// Query direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges whose source is the node.
    Out,
    /// Edges whose target is the node.
    In,
    /// Either endpoint.
    Any,
}

/// Type-specific edge payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeMetadata {
    /// Structural relation with no payload.
    Empty,
    /// Schema relation annotated by the curators.
    Relation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity: Option<String>,
    },
    /// OBLIGATED_BY payload.
    Obligation { amount: f64, recipient: String },
    /// THREATENS payload. Always carries a day count; threats without a
    /// dated deadline never produce an edge.
    Threat {
        days_remaining: i64,
        deadline: NaiveDate,
        description: String,
        severity: String,
    },
}

impl Default for EdgeMetadata {
    fn default() -> Self {
        EdgeMetadata::Empty
    }
}

impl EdgeMetadata {
    /// Days remaining, when this payload counts down to a deadline.
    pub fn days_remaining(&self) -> Option<i64> {
        match self {
            EdgeMetadata::Threat { days_remaining, .. } => Some(*days_remaining),
            _ => None,
        }
    }
}

/// Serializable edge form: endpoints by node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub metadata: EdgeMetadata,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
        metadata: EdgeMetadata,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
            metadata,
        }
    }

    /// Stable sort key for deterministic serialization.
    pub fn sort_key(&self) -> (String, String, String, String) {
        (
            self.source.clone(),
            self.target.clone(),
            self.edge_type.to_string(),
            serde_json::to_string(&self.metadata).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_type_wire_format() {
        let json = serde_json::to_string(&EdgeType::TrustObligation).unwrap();
        assert_eq!(json, "\"TRUST_OBLIGATION\"");
    }

    #[test]
    fn test_threat_metadata_round_trip() {
        let metadata = EdgeMetadata::Threat {
            days_remaining: 4,
            deadline: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            description: "CR expiration".to_string(),
            severity: "CRITICAL".to_string(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["kind"], "threat");
        assert_eq!(json["days_remaining"], 4);
        let back: EdgeMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
        assert_eq!(back.days_remaining(), Some(4));
    }

    #[test]
    fn test_relation_metadata_omits_empty_fields() {
        let metadata = EdgeMetadata::Relation {
            description: None,
            severity: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"kind":"relation"}"#);
    }
}
