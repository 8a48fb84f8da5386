//! Planner configuration.

use serde::{Deserialize, Serialize};

use crate::error::CompilerError;

/// Knobs for a single compile call. All fields default so that an empty JSON
/// object (`{}`) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanOptions {
    /// Compile every stage, chained in declaration order. When false only the
    /// first stage is compiled.
    pub multi_stage: bool,
    /// Compile every execution phase of a stage. When false only the first
    /// phase is compiled.
    pub multi_phase: bool,
    /// Run plan invariant validation after creation in `compile`.
    pub validate: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            multi_stage: true,
            multi_phase: true,
            validate: true,
        }
    }
}

impl PlanOptions {
    /// Options matching the single-stage, single-phase behaviour of older plans.
    pub fn legacy() -> Self {
        PlanOptions {
            multi_stage: false,
            multi_phase: false,
            validate: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        serde_json::from_str(json).map_err(|e| {
            CompilerError::parse("P002", format!("Failed to parse plan options JSON: {}", e))
        })
    }
}
