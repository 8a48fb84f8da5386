//! Plan invariant validation.
//!
//! Checks that a compiled `ExecutionPlan` is closed, uniquely identified,
//! acyclic and that every node's facilitator matches the shape of its
//! parameters. Creators are expected to never produce a plan that fails here.

use std::collections::HashSet;

use petgraph::algo::is_cyclic_directed;
use petgraph::visit::Bfs;
use thiserror::Error;

use super::graph::PlanGraph;
use super::types::*;

#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}{}", at_node(.node_id))]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
    /// The node id where the error was found, if applicable.
    pub node_id: Option<String>,
}

fn at_node(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!(" (at node '{}')", id),
        None => String::new(),
    }
}

/// Validate a compiled plan against all invariants. Returns all errors found.
pub fn validate_plan(plan: &ExecutionPlan) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_starting_node(plan, &mut errors);
    validate_unique_node_ids(plan, &mut errors);
    validate_references_closed(plan, &mut errors);
    validate_facilitator_shapes(plan, &mut errors);

    let graph = PlanGraph::build(plan);
    validate_acyclic(&graph, &mut errors);
    validate_reachable(plan, &graph, &mut errors);

    errors
}

// ---------------------------------------------------------------------------
// E001: plan is non-empty and its entry exists
// ---------------------------------------------------------------------------

fn validate_starting_node(plan: &ExecutionPlan, errors: &mut Vec<ValidationError>) {
    if plan.nodes.is_empty() {
        errors.push(ValidationError {
            code: "E001",
            message: "Plan must contain at least one node".into(),
            node_id: None,
        });
        return;
    }
    if plan.starting_node().is_none() {
        errors.push(ValidationError {
            code: "E001",
            message: format!(
                "Starting node '{}' is not part of the plan",
                plan.starting_node_id
            ),
            node_id: Some(plan.starting_node_id.clone()),
        });
    }
}

// ---------------------------------------------------------------------------
// E002: node ids are pairwise distinct
// ---------------------------------------------------------------------------

fn validate_unique_node_ids(plan: &ExecutionPlan, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in &plan.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError {
                code: "E002",
                message: format!("Duplicate node id '{}'", node.id),
                node_id: Some(node.id.clone()),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// E003: every referenced id exists
// ---------------------------------------------------------------------------

fn validate_references_closed(plan: &ExecutionPlan, errors: &mut Vec<ValidationError>) {
    let ids: HashSet<&str> = plan.nodes.iter().map(|n| n.id.as_str()).collect();
    for node in &plan.nodes {
        for referenced in node.step_parameters.referenced_node_ids() {
            if !ids.contains(referenced) {
                errors.push(ValidationError {
                    code: "E003",
                    message: format!(
                        "Node '{}' references node '{}' which is not in the plan",
                        node.identifier, referenced
                    ),
                    node_id: Some(node.id.clone()),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// E004 / E005: facilitator matches the child list
// ---------------------------------------------------------------------------

fn validate_facilitator_shapes(plan: &ExecutionPlan, errors: &mut Vec<ValidationError>) {
    for node in &plan.nodes {
        let children = node.step_parameters.child_node_ids();
        let shape_error = match node.facilitator {
            Facilitator::Task | Facilitator::Sync if !children.is_empty() => {
                Some(format!("{} node must not have children", node.facilitator))
            }
            Facilitator::Child if children.len() != 1 => Some(format!(
                "CHILD node must have exactly one child, found {}",
                children.len()
            )),
            Facilitator::ChildChain | Facilitator::Children if children.is_empty() => {
                Some(format!("{} node has an empty child list", node.facilitator))
            }
            _ => None,
        };
        if let Some(message) = shape_error {
            errors.push(ValidationError {
                code: "E004",
                message: format!("Node '{}': {}", node.identifier, message),
                node_id: Some(node.id.clone()),
            });
        }

        let mut seen = HashSet::new();
        for child in children {
            if !seen.insert(child) {
                errors.push(ValidationError {
                    code: "E005",
                    message: format!(
                        "Node '{}' lists child '{}' more than once",
                        node.identifier, child
                    ),
                    node_id: Some(node.id.clone()),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// E006: no cycles
// ---------------------------------------------------------------------------

fn validate_acyclic(graph: &PlanGraph, errors: &mut Vec<ValidationError>) {
    if is_cyclic_directed(&graph.graph) {
        errors.push(ValidationError {
            code: "E006",
            message: "Plan graph contains a cycle".into(),
            node_id: None,
        });
    }
}

// ---------------------------------------------------------------------------
// E007: every node is reachable from the starting node
// ---------------------------------------------------------------------------

fn validate_reachable(plan: &ExecutionPlan, graph: &PlanGraph, errors: &mut Vec<ValidationError>) {
    let Some(&start) = graph.node_indices.get(&plan.starting_node_id) else {
        return;
    };

    let mut reachable = HashSet::new();
    let mut bfs = Bfs::new(&graph.graph, start);
    while let Some(nx) = bfs.next(&graph.graph) {
        reachable.insert(nx);
    }

    for node in &plan.nodes {
        let Some(&idx) = graph.node_indices.get(&node.id) else {
            continue;
        };
        if !reachable.contains(&idx) {
            errors.push(ValidationError {
                code: "E007",
                message: format!(
                    "Node '{}' is not reachable from the starting node",
                    node.identifier
                ),
                node_id: Some(node.id.clone()),
            });
        }
    }
}
