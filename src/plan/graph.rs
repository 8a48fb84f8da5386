//! petgraph-based directed view of a compiled plan.
//!
//! Edges run parent → child for every structural reference (children and
//! rollback entries). Ids that are not part of the plan get no edge.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::types::ExecutionPlan;

pub struct PlanGraph {
    pub graph: DiGraph<String, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl PlanGraph {
    pub fn build(plan: &ExecutionPlan) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &plan.nodes {
            if node_indices.contains_key(&node.id) {
                continue;
            }
            let idx = graph.add_node(node.id.clone());
            node_indices.insert(node.id.clone(), idx);
        }

        for node in &plan.nodes {
            let source = node_indices[&node.id];
            for child in node.step_parameters.structural_node_ids() {
                if let Some(&target) = node_indices.get(child) {
                    graph.add_edge(source, target, ());
                }
            }
        }

        PlanGraph { graph, node_indices }
    }

    pub fn successors(&self, node_id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn predecessors(&self, node_id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn incoming_count(&self, node_id: &str) -> usize {
        self.predecessors(node_id).len()
    }
}
