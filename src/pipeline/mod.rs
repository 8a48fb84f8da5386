//! Source pipeline configuration: types + JSON entry point.

pub mod types;

pub use types::*;

use crate::error::CompilerError;

/// Deserialize a pipeline JSON string into a `Pipeline`.
pub fn parse(json: &str) -> Result<Pipeline, CompilerError> {
    serde_json::from_str::<Pipeline>(json).map_err(|e| {
        CompilerError::parse("P001", format!("Failed to parse pipeline JSON: {}", e))
    })
}
