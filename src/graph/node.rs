//! Graph node variants.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{AccessType, CiStatus, ConfidenceScore, FundingType, Priority, Program};

/// Singleton id of the federal trust responsibility super-node.
pub const TRUST_NODE_ID: &str = "FEDERAL_TRUST_RESPONSIBILITY";

/// Type tag used by queries and serialization summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Program,
    Authority,
    FundingVehicle,
    Barrier,
    AdvocacyLever,
    TrustSuperNode,
    Obligation,
    Threat,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeType::Program => "program",
            NodeType::Authority => "authority",
            NodeType::FundingVehicle => "funding_vehicle",
            NodeType::Barrier => "barrier",
            NodeType::AdvocacyLever => "advocacy_lever",
            NodeType::TrustSuperNode => "trust_super_node",
            NodeType::Obligation => "obligation",
            NodeType::Threat => "threat",
        };
        write!(f, "{s}")
    }
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum GraphNode {
    Program(ProgramNode),
    Authority(AuthorityNode),
    FundingVehicle(FundingVehicleNode),
    Barrier(BarrierNode),
    AdvocacyLever(AdvocacyLeverNode),
    TrustSuperNode(TrustSuperNode),
    Obligation(ObligationNode),
    Threat(ThreatNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Program(n) => &n.id,
            GraphNode::Authority(n) => &n.id,
            GraphNode::FundingVehicle(n) => &n.id,
            GraphNode::Barrier(n) => &n.id,
            GraphNode::AdvocacyLever(n) => &n.id,
            GraphNode::TrustSuperNode(n) => &n.id,
            GraphNode::Obligation(n) => &n.id,
            GraphNode::Threat(n) => &n.id,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            GraphNode::Program(_) => NodeType::Program,
            GraphNode::Authority(_) => NodeType::Authority,
            GraphNode::FundingVehicle(_) => NodeType::FundingVehicle,
            GraphNode::Barrier(_) => NodeType::Barrier,
            GraphNode::AdvocacyLever(_) => NodeType::AdvocacyLever,
            GraphNode::TrustSuperNode(_) => NodeType::TrustSuperNode,
            GraphNode::Obligation(_) => NodeType::Obligation,
            GraphNode::Threat(_) => NodeType::Threat,
        }
    }
}

/// Program node, projected from the inventory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub id: String,
    pub name: String,
    pub agency: String,
    pub cfda: Option<String>,
    pub ci_status: CiStatus,
    pub confidence_index: f64,
    pub priority: Priority,
    pub funding_type: FundingType,
    pub access_type: Option<AccessType>,
}

impl From<&Program> for ProgramNode {
    fn from(program: &Program) -> Self {
        Self {
            id: program.id.clone(),
            name: program.name.clone(),
            agency: program.agency.clone(),
            cfda: program.cfda.clone(),
            ci_status: program.ci_status,
            confidence_index: program.confidence_index,
            priority: program.priority,
            funding_type: program.funding_type,
            access_type: program.access_type,
        }
    }
}

/// Statutory or regulatory authority (`auth_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityNode {
    pub id: String,
    pub name: String,
    pub citation: String,
    /// Free text such as "Permanent", "Active through FY27", "Expires FY26".
    pub durability: String,
}

impl AuthorityNode {
    /// True for authorities that survive an appropriations lapse.
    pub fn is_durable(&self) -> bool {
        let lower = self.durability.to_lowercase();
        lower.contains("permanent") || lower.contains("active")
    }

    /// True for IIJA supplemental authorities sunsetting with FY26.
    pub fn expires_fy26(&self) -> bool {
        self.durability.to_lowercase().contains("expires fy26")
    }
}

/// Appropriations vehicle (`fund_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingVehicleNode {
    pub id: String,
    pub name: String,
    /// Matches the program funding-type vocabulary (discretionary, ...).
    pub vehicle_type: String,
}

impl FundingVehicleNode {
    pub fn is_discretionary(&self) -> bool {
        self.vehicle_type.eq_ignore_ascii_case("discretionary")
    }
}

/// Structural barrier to Tribal access (`bar_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierNode {
    pub id: String,
    pub name: String,
    /// High, Medium, or Low.
    pub severity: String,
    #[serde(default)]
    pub description: String,
}

impl BarrierNode {
    pub fn is_high_severity(&self) -> bool {
        self.severity.eq_ignore_ascii_case("high")
    }
}

/// Advocacy lever (`lever_*`) or structural ask (`ask_*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvocacyLeverNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl AdvocacyLeverNode {
    /// The five Structural Asks carry the `ask_` prefix; other levers are
    /// program-scoped.
    pub fn is_structural_ask(&self) -> bool {
        self.id.starts_with("ask_")
    }
}

/// The federal trust responsibility singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSuperNode {
    pub id: String,
    pub legal_basis: Vec<String>,
}

/// A spending obligation folded in from a scored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationNode {
    pub id: String,
    pub amount: f64,
    pub recipient: String,
    pub date: Option<NaiveDate>,
    pub cfda: String,
    #[serde(rename = "_confidence")]
    pub confidence: ConfidenceScore,
}

/// Transient threat created from a monitor alert. Identity is
/// `(threat_type, program_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatNode {
    pub id: String,
    pub threat_type: String,
    pub program_id: String,
    pub description: String,
}

impl ThreatNode {
    pub fn node_id(threat_type: &str, program_id: &str) -> String {
        format!("threat_{threat_type}_{program_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_durability_predicates() {
        let auth = AuthorityNode {
            id: "auth_stafford".to_string(),
            name: "Stafford Act".to_string(),
            citation: "42 U.S.C. 5121".to_string(),
            durability: "Permanent".to_string(),
        };
        assert!(auth.is_durable());
        assert!(!auth.expires_fy26());

        let iija = AuthorityNode {
            id: "auth_iija".to_string(),
            name: "IIJA".to_string(),
            citation: "P.L. 117-58".to_string(),
            durability: "Expires FY26".to_string(),
        };
        assert!(iija.expires_fy26());
    }

    #[test]
    fn test_structural_ask_prefix() {
        let ask = AdvocacyLeverNode {
            id: "ask_direct_access".to_string(),
            name: "Direct access".to_string(),
            description: String::new(),
        };
        let lever = AdvocacyLeverNode {
            id: "lever_bric_restore".to_string(),
            name: "Restore BRIC".to_string(),
            description: String::new(),
        };
        assert!(ask.is_structural_ask());
        assert!(!lever.is_structural_ask());
    }

    #[test]
    fn test_node_serde_tag() {
        let node = GraphNode::Barrier(BarrierNode {
            id: "bar_match".to_string(),
            name: "Cost-share match".to_string(),
            severity: "High".to_string(),
            description: String::new(),
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["node_type"], "barrier");
        let back: GraphNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_threat_node_identity() {
        assert_eq!(
            ThreatNode::node_id("dhs_funding_cliff", "fema_bric"),
            "threat_dhs_funding_cliff_fema_bric"
        );
    }
}
