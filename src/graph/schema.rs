//! Static graph schema loaded from `graph_schema.json`.
//!
//! The schema carries the curated universe the scanner reasons over:
//! authorities, funding vehicles, barriers, advocacy levers (including the
//! five Structural Asks), the trust super-node, and the structural relations
//! between them. It is reference data, regenerated offline; the pipeline only
//! reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::edge::EdgeType;
use crate::graph::node::{
    AdvocacyLeverNode, AuthorityNode, BarrierNode, FundingVehicleNode, TRUST_NODE_ID,
};

/// Trust super-node definition plus the programs it obligates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDef {
    #[serde(default = "default_trust_id")]
    pub id: String,
    #[serde(default)]
    pub legal_basis: Vec<String>,
    /// Programs connected by TRUST_OBLIGATION edges.
    #[serde(default)]
    pub trust_programs: Vec<String>,
}

fn default_trust_id() -> String {
    TRUST_NODE_ID.to_string()
}

impl Default for TrustDef {
    fn default() -> Self {
        Self {
            id: default_trust_id(),
            legal_basis: Vec::new(),
            trust_programs: Vec::new(),
        }
    }
}

/// A curated structural relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// The full static schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSchema {
    pub trust_super_node: TrustDef,
    pub authorities: Vec<AuthorityNode>,
    pub funding_vehicles: Vec<FundingVehicleNode>,
    pub barriers: Vec<BarrierNode>,
    pub advocacy_levers: Vec<AdvocacyLeverNode>,
    pub relations: Vec<RelationDef>,
}

impl GraphSchema {
    /// Load the schema. Missing or invalid content is fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        let schema: Self = serde_json::from_slice(&raw)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Schema-level sanity: no THREATENS relations (those are transient and
    /// regenerated per run), and exactly five Structural Asks when any are
    /// defined.
    pub fn validate(&self) -> Result<()> {
        if self
            .relations
            .iter()
            .any(|r| r.edge_type == EdgeType::Threatens)
        {
            return Err(Error::config(
                "graph schema must not declare THREATENS relations",
            ));
        }
        let asks = self.structural_asks().count();
        if asks != 0 && asks != 5 {
            return Err(Error::config(format!(
                "expected the five structural asks, found {asks}"
            )));
        }
        Ok(())
    }

    /// The five `ask_*` levers.
    pub fn structural_asks(&self) -> impl Iterator<Item = &AdvocacyLeverNode> {
        self.advocacy_levers.iter().filter(|l| l.is_structural_ask())
    }
}

/// A compact schema for tests: two authorities, one vehicle, one barrier,
/// the five asks plus a program lever, and the core relations.
#[cfg(test)]
pub(crate) fn sample_schema() -> GraphSchema {
    let lever = |id: &str, name: &str| AdvocacyLeverNode {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
    };
    GraphSchema {
        trust_super_node: TrustDef {
            id: TRUST_NODE_ID.to_string(),
            legal_basis: vec!["Cherokee Nation v. Georgia, 30 U.S. 1 (1831)".to_string()],
            trust_programs: vec!["bia_tcr".to_string()],
        },
        authorities: vec![
            AuthorityNode {
                id: "auth_stafford".to_string(),
                name: "Stafford Act".to_string(),
                citation: "42 U.S.C. 5121".to_string(),
                durability: "Permanent".to_string(),
            },
            AuthorityNode {
                id: "auth_iija".to_string(),
                name: "Infrastructure Investment and Jobs Act".to_string(),
                citation: "P.L. 117-58".to_string(),
                durability: "Expires FY26".to_string(),
            },
        ],
        funding_vehicles: vec![FundingVehicleNode {
            id: "fund_dhs_approps".to_string(),
            name: "DHS annual appropriations".to_string(),
            vehicle_type: "discretionary".to_string(),
        }],
        barriers: vec![BarrierNode {
            id: "bar_state_pass_through".to_string(),
            name: "State pass-through requirement".to_string(),
            severity: "High".to_string(),
            description: String::new(),
        }],
        advocacy_levers: vec![
            lever("ask_direct_access", "Direct Tribal access"),
            lever("ask_match_waiver", "Non-federal match waiver"),
            lever("ask_permanent_authority", "Permanent program authority"),
            lever("ask_consultation", "Consultation with consent standards"),
            lever("ask_set_aside_floor", "Tribal set-aside floors"),
            lever("lever_bric_restore", "Restore BRIC funding"),
        ],
        relations: vec![
            RelationDef {
                source: "bia_tcr".to_string(),
                target: "auth_stafford".to_string(),
                edge_type: EdgeType::AuthorizedBy,
                description: None,
                severity: None,
            },
            RelationDef {
                source: "bia_tcr".to_string(),
                target: "fund_dhs_approps".to_string(),
                edge_type: EdgeType::FundedBy,
                description: None,
                severity: None,
            },
            RelationDef {
                source: "ask_direct_access".to_string(),
                target: "bia_tcr".to_string(),
                edge_type: EdgeType::Advances,
                description: None,
                severity: None,
            },
            RelationDef {
                source: "bar_state_pass_through".to_string(),
                target: "ask_direct_access".to_string(),
                edge_type: EdgeType::MitigatedBy,
                description: None,
                severity: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validates() {
        sample_schema().validate().unwrap();
    }

    #[test]
    fn test_threatens_relation_rejected() {
        let mut schema = sample_schema();
        schema.relations.push(RelationDef {
            source: "bar_state_pass_through".to_string(),
            target: "bia_tcr".to_string(),
            edge_type: EdgeType::Threatens,
            description: None,
            severity: None,
        });
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_wrong_ask_count_rejected() {
        let mut schema = sample_schema();
        schema.advocacy_levers.retain(|l| l.id != "ask_set_aside_floor");
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_structural_asks_excludes_program_levers() {
        let schema = sample_schema();
        assert_eq!(schema.structural_asks().count(), 5);
        assert!(schema.structural_asks().all(|l| l.id.starts_with("ask_")));
    }
}
