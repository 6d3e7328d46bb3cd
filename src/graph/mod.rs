//! The policy knowledge graph.
//!
//! Rebuilt from scratch every run: static schema nodes (authorities, funding
//! vehicles, barriers, advocacy levers, the trust super-node), one node per
//! tracked program, and obligation nodes folded in from spending items.
//! Monitors attach transient THREATENS edges after the build; those edges are
//! never persisted across runs.

pub mod builder;
pub mod edge;
pub mod knowledge;
pub mod node;
pub mod schema;

pub use builder::GraphBuilder;
pub use edge::{Direction, Edge, EdgeMetadata, EdgeType};
pub use knowledge::{GraphSerial, GraphSummary, KnowledgeGraph};
pub use node::{GraphNode, NodeType, TRUST_NODE_ID};
pub use schema::GraphSchema;
