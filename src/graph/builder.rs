//! Graph construction from schema, inventory, and scored items.

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::edge::{Direction, EdgeMetadata, EdgeType};
use crate::graph::knowledge::KnowledgeGraph;
use crate::graph::node::{GraphNode, ObligationNode, TrustSuperNode};
use crate::graph::schema::GraphSchema;
use crate::model::{ProgramInventory, ScoredItem, Source};

/// Builds the per-run knowledge graph.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Seed the graph from the static schema and inventory, then fold in
    /// obligation nodes from spending items with tracked CFDAs.
    ///
    /// Fails with [`Error::InvariantViolation`] on schema relations touching
    /// unknown nodes and on programs left without an AUTHORIZED_BY edge.
    pub fn build(
        inventory: &ProgramInventory,
        items: &[ScoredItem],
        schema: &GraphSchema,
    ) -> Result<KnowledgeGraph> {
        let mut graph = KnowledgeGraph::new();

        // Static universe first: trust super-node, then curated node sets.
        graph.add_node(GraphNode::TrustSuperNode(TrustSuperNode {
            id: schema.trust_super_node.id.clone(),
            legal_basis: schema.trust_super_node.legal_basis.clone(),
        }))?;
        for authority in &schema.authorities {
            graph.add_node(GraphNode::Authority(authority.clone()))?;
        }
        for vehicle in &schema.funding_vehicles {
            graph.add_node(GraphNode::FundingVehicle(vehicle.clone()))?;
        }
        for barrier in &schema.barriers {
            graph.add_node(GraphNode::Barrier(barrier.clone()))?;
        }
        for lever in &schema.advocacy_levers {
            graph.add_node(GraphNode::AdvocacyLever(lever.clone()))?;
        }

        for program in inventory.iter() {
            graph.add_node(GraphNode::Program(program.into()))?;
        }

        // Curated structural relations. Unknown endpoints surface here as
        // invariant violations; a relation may only reference programs that
        // exist in the inventory.
        for relation in &schema.relations {
            let metadata = match (&relation.description, &relation.severity) {
                (None, None) => EdgeMetadata::Empty,
                (description, severity) => EdgeMetadata::Relation {
                    description: description.clone(),
                    severity: severity.clone(),
                },
            };
            graph.add_edge(&relation.source, &relation.target, relation.edge_type, metadata)?;
        }

        // Trust obligations for the designated programs.
        for program_id in &schema.trust_super_node.trust_programs {
            graph.add_edge(
                program_id,
                &schema.trust_super_node.id,
                EdgeType::TrustObligation,
                EdgeMetadata::Empty,
            )?;
        }

        Self::fold_obligations(&mut graph, inventory, items)?;
        Self::check_authorization(&graph, inventory)?;

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "knowledge graph built"
        );
        Ok(graph)
    }

    fn fold_obligations(
        graph: &mut KnowledgeGraph,
        inventory: &ProgramInventory,
        items: &[ScoredItem],
    ) -> Result<()> {
        for item in items.iter().filter(|i| i.source == Source::Spending) {
            let Some(cfda) = &item.cfda else { continue };
            let Some(program) = inventory.by_cfda(cfda) else {
                continue;
            };

            let amount = item
                .extras
                .get("amount")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let recipient = item
                .extras
                .get("recipient")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown recipient")
                .to_string();

            let obligation_id = format!("obligation_{}", item.source_id);
            graph.add_node(GraphNode::Obligation(ObligationNode {
                id: obligation_id.clone(),
                amount,
                recipient: recipient.clone(),
                date: item.published_at,
                cfda: cfda.clone(),
                confidence: item.confidence.clone(),
            }))?;
            graph.add_edge(
                &program.id,
                &obligation_id,
                EdgeType::ObligatedBy,
                EdgeMetadata::Obligation { amount, recipient },
            )?;
        }
        Ok(())
    }

    fn check_authorization(graph: &KnowledgeGraph, inventory: &ProgramInventory) -> Result<()> {
        for program in inventory.iter() {
            if program.unauthorized_placeholder {
                continue;
            }
            let authorized = !graph
                .edges(&program.id, Some(EdgeType::AuthorizedBy), Direction::Out)
                .is_empty();
            if !authorized {
                return Err(Error::invariant(format!(
                    "program {:?} has no AUTHORIZED_BY edge and is not an unauthorized placeholder",
                    program.id
                )));
            }
        }
        Ok(())
    }
}
