//! Per-compile context threaded through every creator call.
//!
//! The context is an immutable value. Entering a nested scope (pipeline,
//! stage, phase) produces an extended copy, so sibling subtrees and
//! concurrent compiles never observe each other's "current" scope.

use crate::error::CompilerError;
use crate::options::PlanOptions;
use crate::pipeline::types::{Phase, Pipeline, Stage};
use crate::plan::types::CreateExecutionPlanResponse;

use super::PlanTarget;
use super::dependency::StepDependencyService;
use super::registry::PlanCreatorRegistry;

#[derive(Clone, Copy)]
pub struct PlanCreationContext<'a> {
    registry: &'a PlanCreatorRegistry,
    options: &'a PlanOptions,
    dependencies: &'a dyn StepDependencyService,
    pipeline: Option<&'a Pipeline>,
    stage: Option<&'a Stage>,
    phase: Option<&'a Phase>,
}

impl<'a> PlanCreationContext<'a> {
    pub fn new(
        registry: &'a PlanCreatorRegistry,
        options: &'a PlanOptions,
        dependencies: &'a dyn StepDependencyService,
    ) -> Self {
        PlanCreationContext {
            registry,
            options,
            dependencies,
            pipeline: None,
            stage: None,
            phase: None,
        }
    }

    pub fn with_pipeline(&self, pipeline: &'a Pipeline) -> Self {
        PlanCreationContext {
            pipeline: Some(pipeline),
            ..*self
        }
    }

    pub fn with_stage(&self, stage: &'a Stage) -> Self {
        PlanCreationContext {
            stage: Some(stage),
            phase: None,
            ..*self
        }
    }

    pub fn with_phase(&self, phase: &'a Phase) -> Self {
        PlanCreationContext {
            phase: Some(phase),
            ..*self
        }
    }

    pub fn options(&self) -> &'a PlanOptions {
        self.options
    }

    pub fn dependencies(&self) -> &'a dyn StepDependencyService {
        self.dependencies
    }

    /// The pipeline under compilation. Only absent when a creator is invoked
    /// outside of a pipeline compile, which is a wiring bug.
    pub fn pipeline(&self) -> Result<&'a Pipeline, CompilerError> {
        self.pipeline.ok_or_else(|| {
            CompilerError::internal("C004", "No pipeline stored in the plan creation context")
        })
    }

    pub fn current_stage(&self) -> Option<&'a Stage> {
        self.stage
    }

    pub fn current_phase(&self) -> Option<&'a Phase> {
        self.phase
    }

    /// Compile `target` with whichever registered creator claims it.
    /// `context_message` names the caller's intent for "missing creator" errors.
    pub fn create(
        &self,
        target: &PlanTarget<'_>,
        context_message: &str,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let creator = self.registry.obtain(target, context_message)?;
        creator.create_plan(target, self)
    }
}

impl std::fmt::Debug for PlanCreationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCreationContext")
            .field("pipeline", &self.pipeline.map(|p| p.identifier.as_str()))
            .field("stage", &self.stage.map(|s| s.identifier.as_str()))
            .field("phase", &self.phase.map(|p| p.identifier.as_str()))
            .finish()
    }
}
