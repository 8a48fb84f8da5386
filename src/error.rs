//! Unified compiler error type used across all phases.

use serde::Serialize;
use thiserror::Error;

use crate::plan::validate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Phase {
    Parse,
    Plan,
    PlanValidate,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Plan => write!(f, "Plan"),
            Phase::PlanValidate => write!(f, "Plan Validate"),
        }
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// No registered creator accepted a `(kind, object)` pair.
    MissingCreator,
    /// Input is structurally present but semantically wrong.
    InvalidArguments,
    /// A `useFromStage` (or similar) reference points at nothing.
    UnresolvableReference,
    /// A registration or wiring bug inside the compiler itself.
    Internal,
}

#[derive(Debug, Clone, Error)]
#[error("[{phase}:{code}] {message}{}", at_node(.node_id))]
pub struct CompilerError {
    pub code: String,
    pub phase: Phase,
    pub kind: ErrorKind,
    pub message: String,
    pub node_id: Option<String>,
}

fn at_node(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!(" (node '{}')", id),
        None => String::new(),
    }
}

impl From<ValidationError> for CompilerError {
    fn from(e: ValidationError) -> Self {
        CompilerError {
            code: e.code.to_string(),
            phase: Phase::PlanValidate,
            kind: ErrorKind::Internal,
            message: e.message,
            node_id: e.node_id,
        }
    }
}

impl CompilerError {
    pub fn parse(code: &str, message: impl Into<String>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Parse,
            kind: ErrorKind::InvalidArguments,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn missing_creator(kind: impl std::fmt::Display, context: &str) -> Self {
        CompilerError {
            code: "C001".into(),
            phase: Phase::Plan,
            kind: ErrorKind::MissingCreator,
            message: format!("{} (type: {})", context, kind),
            node_id: None,
        }
    }

    pub fn invalid(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Plan,
            kind: ErrorKind::InvalidArguments,
            message: message.into(),
            node_id,
        }
    }

    pub fn unresolvable(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Plan,
            kind: ErrorKind::UnresolvableReference,
            message: message.into(),
            node_id,
        }
    }

    pub fn internal(code: &str, message: impl Into<String>) -> Self {
        CompilerError {
            code: code.into(),
            phase: Phase::Plan,
            kind: ErrorKind::Internal,
            message: message.into(),
            node_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_node_when_present() {
        let err = CompilerError::invalid("C011", "dup", Some("stage1".into()));
        assert_eq!(err.to_string(), "[Plan:C011] dup (node 'stage1')");

        let err = CompilerError::internal("C002", "ambiguous");
        assert_eq!(err.to_string(), "[Plan:C002] ambiguous");
    }
}
