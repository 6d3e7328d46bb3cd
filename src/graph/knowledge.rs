//! Arena-backed knowledge graph with linear-scan queries.
//!
//! The graph is small (on the order of 200 nodes and 250 edges), so edges are
//! a flat vector of index pairs and every query is a linear filter. Node ids
//! resolve through a side index; edges never hold references into the node
//! arena, which keeps insertion and serialization simple.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::edge::{Direction, Edge, EdgeMetadata, EdgeType};
use crate::graph::node::{GraphNode, NodeType};

#[derive(Debug, Clone, PartialEq)]
struct EdgeRecord {
    src: usize,
    dst: usize,
    edge_type: EdgeType,
    metadata: EdgeMetadata,
}

/// The rebuilt-per-run policy graph.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    edges: Vec<EdgeRecord>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Re-inserting an identical node is a no-op; a different
    /// node under an existing id is a design bug.
    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if let Some(&existing) = self.index.get(node.id()) {
            if self.nodes[existing] == node {
                return Ok(());
            }
            return Err(Error::invariant(format!(
                "node id {:?} already present with different content",
                node.id()
            )));
        }
        self.index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Insert an edge between existing nodes.
    ///
    /// An identical duplicate is a no-op; a duplicate `(source, target,
    /// type)` with conflicting metadata is a design bug.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        edge_type: EdgeType,
        metadata: EdgeMetadata,
    ) -> Result<()> {
        let src = *self.index.get(source).ok_or_else(|| {
            Error::invariant(format!("edge source {source:?} is not a known node"))
        })?;
        let dst = *self.index.get(target).ok_or_else(|| {
            Error::invariant(format!("edge target {target:?} is not a known node"))
        })?;

        for edge in &self.edges {
            if edge.src == src && edge.dst == dst && edge.edge_type == edge_type {
                if edge.metadata == metadata {
                    return Ok(());
                }
                return Err(Error::invariant(format!(
                    "duplicate {edge_type} edge {source:?} -> {target:?} with conflicting metadata"
                )));
            }
        }

        self.edges.push(EdgeRecord {
            src,
            dst,
            edge_type,
            metadata,
        });
        Ok(())
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges touching `node_id`, filtered by type and direction.
    pub fn edges(
        &self,
        node_id: &str,
        edge_type: Option<EdgeType>,
        direction: Direction,
    ) -> Vec<Edge> {
        let Some(&idx) = self.index.get(node_id) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|e| match direction {
                Direction::Out => e.src == idx,
                Direction::In => e.dst == idx,
                Direction::Any => e.src == idx || e.dst == idx,
            })
            .filter(|e| edge_type.map_or(true, |t| e.edge_type == t))
            .map(|e| self.to_edge(e))
            .collect()
    }

    /// All edges of a type, anywhere in the graph.
    pub fn edges_of_type(&self, edge_type: EdgeType) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .map(|e| self.to_edge(e))
            .collect()
    }

    /// Nodes of one type, in insertion order.
    pub fn nodes_by_type(&self, node_type: NodeType) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(move |n| n.node_type() == node_type)
    }

    fn to_edge(&self, record: &EdgeRecord) -> Edge {
        Edge {
            source: self.nodes[record.src].id().to_string(),
            target: self.nodes[record.dst].id().to_string(),
            edge_type: record.edge_type,
            metadata: record.metadata.clone(),
        }
    }

    /// Stable serializable projection. Edges are sorted, so two graphs with
    /// the same content serialize identically regardless of insertion order.
    pub fn to_serializable(&self) -> GraphSerial {
        let nodes: BTreeMap<String, GraphNode> = self
            .nodes
            .iter()
            .map(|n| (n.id().to_string(), n.clone()))
            .collect();

        let mut edges: Vec<Edge> = self.edges.iter().map(|e| self.to_edge(e)).collect();
        edges.sort_by_key(|e| e.sort_key());

        let mut nodes_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            *nodes_by_type.entry(node.node_type().to_string()).or_default() += 1;
        }
        let mut edges_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &edges {
            *edges_by_type.entry(edge.edge_type.to_string()).or_default() += 1;
        }

        GraphSerial {
            summary: GraphSummary {
                node_count: self.nodes.len(),
                edge_count: edges.len(),
                nodes_by_type,
                edges_by_type,
            },
            nodes,
            edges,
        }
    }

    /// Rebuild a graph from its serializable projection.
    pub fn from_serializable(serial: &GraphSerial) -> Result<Self> {
        let mut graph = Self::new();
        for node in serial.nodes.values() {
            graph.add_node(node.clone())?;
        }
        for edge in &serial.edges {
            graph.add_edge(&edge.source, &edge.target, edge.edge_type, edge.metadata.clone())?;
        }
        Ok(graph)
    }
}

/// Stable JSON shape consumed by the reporter and the monitor layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSerial {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<Edge>,
    pub summary: GraphSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub edges_by_type: BTreeMap<String, usize>,
}
