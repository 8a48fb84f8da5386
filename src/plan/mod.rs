//! The compiled plan graph: node model, petgraph view and invariant checks.

pub mod graph;
pub mod types;
pub mod validate;

pub use graph::PlanGraph;
pub use types::*;
pub use validate::{validate_plan, ValidationError};
