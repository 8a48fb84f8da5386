//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::error::CompilerError;
use crate::options::PlanOptions;
use crate::plan::{ExecutionPlan, validate_plan};

/// Full pipeline: parse → create plan → validate.
/// Returns a JSON object tagged by `status`, carrying either `plan` or `errors`.
/// `options_json` may be empty, which selects the default options.
#[wasm_bindgen]
pub fn compile_pipeline(json: &str, options_json: &str) -> JsValue {
    let result = compile_pipeline_inner(json, options_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Validate an already compiled plan JSON.
/// Returns a JSON array of CompilerError objects.
#[wasm_bindgen]
pub fn validate_execution_plan(plan_json: &str) -> JsValue {
    let result = validate_execution_plan_inner(plan_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn compile_pipeline_inner(json: &str, options_json: &str) -> CompileResult {
    let options = if options_json.trim().is_empty() {
        PlanOptions::default()
    } else {
        match PlanOptions::from_json(options_json) {
            Ok(o) => o,
            Err(e) => return CompileResult::Errors { errors: vec![ErrorDto::from(e)] },
        }
    };

    let pipeline = match crate::pipeline::parse(json) {
        Ok(p) => p,
        Err(e) => return CompileResult::Errors { errors: vec![ErrorDto::from(e)] },
    };

    match crate::creator::compile(&pipeline, &options) {
        Ok(plan) => CompileResult::Success { plan },
        Err(errors) => CompileResult::Errors {
            errors: errors.into_iter().map(ErrorDto::from).collect(),
        },
    }
}

fn validate_execution_plan_inner(plan_json: &str) -> Vec<ErrorDto> {
    let plan = match serde_json::from_str::<ExecutionPlan>(plan_json) {
        Ok(p) => p,
        Err(e) => {
            return vec![ErrorDto::from(CompilerError::parse(
                "P001",
                format!("Failed to parse execution plan JSON: {}", e),
            ))];
        }
    };
    validate_plan(&plan)
        .into_iter()
        .map(|e| ErrorDto::from(CompilerError::from(e)))
        .collect()
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize, serde::Deserialize)]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    node_id: Option<String>,
}

impl From<CompilerError> for ErrorDto {
    fn from(e: CompilerError) -> Self {
        ErrorDto {
            code: e.code,
            phase: e.phase.to_string(),
            message: e.message,
            node_id: e.node_id,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
enum CompileResult {
    #[serde(rename = "success")]
    Success { plan: ExecutionPlan },
    #[serde(rename = "errors")]
    Errors { errors: Vec<ErrorDto> },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"{
        "identifier": "p",
        "stages": [{
            "identifier": "s1",
            "spec": {
                "type": "Deployment",
                "phases": [{
                    "identifier": "ph1",
                    "steps": [{"step": {
                        "identifier": "call",
                        "spec": {"type": "Http", "url": "https://example.com", "method": "GET"}
                    }}]
                }]
            }
        }]
    }"#;

    #[test]
    fn compiles_with_default_options() {
        match compile_pipeline_inner(PIPELINE, "") {
            CompileResult::Success { plan } => assert_eq!(plan.nodes.len(), 6),
            CompileResult::Errors { errors } => panic!("unexpected errors: {}", errors.len()),
        }
    }

    #[test]
    fn bad_options_report_p002() {
        match compile_pipeline_inner(PIPELINE, "{\"multiStage\": 1}") {
            CompileResult::Errors { errors } => assert_eq!(errors[0].code, "P002"),
            CompileResult::Success { .. } => panic!("expected an options error"),
        }
    }

    #[test]
    fn bad_plan_json_reports_p001() {
        let errors = validate_execution_plan_inner("not json");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "P001");
    }
}
