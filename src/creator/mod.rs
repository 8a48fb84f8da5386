//! Plan creation: pipeline configuration → flattened plan graph.
//!
//! Every node kind has a creator. Creators never call each other directly;
//! they ask the registry (through the context) to compile a child target and
//! wire the returned starting node ids into their own node.

pub mod artifact;
pub mod composite;
pub mod context;
pub mod dependency;
pub mod infra;
pub mod manifest;
pub mod overrides;
pub mod parallel;
pub mod phase;
pub mod phases;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod stage;
pub mod stages;
pub mod step;

use crate::error::CompilerError;
use crate::options::PlanOptions;
use crate::pipeline::types::*;
use crate::plan::types::{CreateExecutionPlanResponse, ExecutionPlan};
use crate::plan::validate::validate_plan;

use dependency::CompileScope;

pub use artifact::ArtifactSource;
pub use composite::{ChildPlans, CompositePlanCreator, create_composite};
pub use context::PlanCreationContext;
pub use dependency::{InMemoryStepDependencies, StepDependencyInstructor, StepDependencyService};
pub use registry::PlanCreatorRegistry;

// =============================================================================
// DISPATCH MODEL
// =============================================================================

/// Closed set of things a creator can be asked to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Pipeline,
    Stages,
    Stage,
    ExecutionPhases,
    Phase,
    Parallel,
    Service,
    ArtifactFork,
    ArtifactStep,
    Manifests,
    Infrastructure,
    Step,
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanKind::Pipeline => "PIPELINE",
            PlanKind::Stages => "STAGES",
            PlanKind::Stage => "STAGE",
            PlanKind::ExecutionPhases => "EXECUTION_PHASES",
            PlanKind::Phase => "PHASE",
            PlanKind::Parallel => "PARALLEL",
            PlanKind::Service => "SERVICE",
            PlanKind::ArtifactFork => "ARTIFACT_FORK",
            PlanKind::ArtifactStep => "ARTIFACT_STEP",
            PlanKind::Manifests => "MANIFESTS",
            PlanKind::Infrastructure => "INFRASTRUCTURE",
            PlanKind::Step => "STEP",
        };
        write!(f, "{}", s)
    }
}

/// A borrowed configuration object tagged with what it is.
#[derive(Debug, Clone, Copy)]
pub enum PlanTarget<'a> {
    Pipeline(&'a Pipeline),
    Stages(&'a [Stage]),
    Stage(&'a Stage),
    ExecutionPhases(&'a [Phase]),
    Phase(&'a Phase),
    Parallel(&'a [StepElement]),
    Service(&'a ServiceConfig),
    ArtifactFork(&'a ServiceConfig),
    ArtifactStep(&'a ArtifactSource),
    Manifests(&'a ServiceConfig),
    Infrastructure(&'a PipelineInfrastructure),
    Step(&'a StepElement),
}

impl PlanTarget<'_> {
    pub fn kind(&self) -> PlanKind {
        match self {
            PlanTarget::Pipeline(_) => PlanKind::Pipeline,
            PlanTarget::Stages(_) => PlanKind::Stages,
            PlanTarget::Stage(_) => PlanKind::Stage,
            PlanTarget::ExecutionPhases(_) => PlanKind::ExecutionPhases,
            PlanTarget::Phase(_) => PlanKind::Phase,
            PlanTarget::Parallel(_) => PlanKind::Parallel,
            PlanTarget::Service(_) => PlanKind::Service,
            PlanTarget::ArtifactFork(_) => PlanKind::ArtifactFork,
            PlanTarget::ArtifactStep(_) => PlanKind::ArtifactStep,
            PlanTarget::Manifests(_) => PlanKind::Manifests,
            PlanTarget::Infrastructure(_) => PlanKind::Infrastructure,
            PlanTarget::Step(_) => PlanKind::Step,
        }
    }
}

/// A compiler for one node kind.
///
/// `supports` must hold only for targets `create_plan` can handle; the
/// registry refuses to guess when two creators claim the same target.
pub trait PlanCreator: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_kinds(&self) -> &'static [PlanKind];

    fn supports(&self, target: &PlanTarget<'_>) -> bool {
        self.supported_kinds().contains(&target.kind())
    }

    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError>;
}

/// Error for a creator handed a target it never claimed.
pub(crate) fn unexpected_target(creator: &str, target: &PlanTarget<'_>) -> CompilerError {
    CompilerError::internal(
        "C003",
        format!("{} cannot compile a {} target", creator, target.kind()),
    )
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Compile a pipeline with the built-in creators and default options.
pub fn create_plan(pipeline: &Pipeline) -> Result<ExecutionPlan, CompilerError> {
    let registry = PlanCreatorRegistry::with_defaults();
    let dependencies = InMemoryStepDependencies::default();
    create_plan_with(pipeline, &registry, &PlanOptions::default(), &dependencies)
}

/// Compile a pipeline against an explicit registry, options and dependency sink.
/// `dependencies` receives the instructors of this compile only when it succeeds.
pub fn create_plan_with(
    pipeline: &Pipeline,
    registry: &PlanCreatorRegistry,
    options: &PlanOptions,
    dependencies: &dyn StepDependencyService,
) -> Result<ExecutionPlan, CompilerError> {
    let scope = CompileScope::new(dependencies);
    let ctx = PlanCreationContext::new(registry, options, &scope);
    let response = ctx.create(
        &PlanTarget::Pipeline(pipeline),
        "no execution plan creator found for pipeline",
    )?;
    scope.commit();
    tracing::debug!(
        pipeline = %pipeline.identifier,
        nodes = response.nodes.len(),
        "created execution plan"
    );
    Ok(response.into())
}

/// Create + validate. Returns every invariant violation when validation fails.
pub fn compile(pipeline: &Pipeline, options: &PlanOptions) -> Result<ExecutionPlan, Vec<CompilerError>> {
    let registry = PlanCreatorRegistry::with_defaults();
    let dependencies = InMemoryStepDependencies::default();
    let plan = create_plan_with(pipeline, &registry, options, &dependencies).map_err(|e| vec![e])?;

    if options.validate {
        let errors = validate_plan(&plan);
        if !errors.is_empty() {
            return Err(errors.into_iter().map(CompilerError::from).collect());
        }
    }

    Ok(plan)
}

/// Identifiers of siblings under one parent must be distinct.
pub(crate) fn ensure_unique_identifiers<'a>(
    identifiers: impl IntoIterator<Item = &'a str>,
    what: &str,
    parent: &str,
) -> Result<(), CompilerError> {
    let mut seen = std::collections::HashSet::new();
    for identifier in identifiers {
        if !seen.insert(identifier) {
            return Err(CompilerError::invalid(
                "C017",
                format!("Duplicate {} identifier '{}' in '{}'", what, identifier, parent),
                Some(identifier.to_string()),
            ));
        }
    }
    Ok(())
}
