//! Creator registry: `PlanKind` → candidate creators.
//!
//! Most kinds have exactly one creator. Where a kind has several (steps split
//! by `StepInfo` variant) the candidates' `supports` predicates pick one.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::CompilerError;

use super::artifact::{ArtifactForkCreator, ArtifactStepCreator};
use super::infra::InfraCreator;
use super::manifest::ManifestStepCreator;
use super::parallel::ParallelCreator;
use super::phase::PhaseCreator;
use super::phases::ExecutionPhasesCreator;
use super::pipeline::PipelineCreator;
use super::service::ServiceCreator;
use super::stage::DeploymentStageCreator;
use super::stages::StagesCreator;
use super::step::{HttpStepCreator, K8sRollingStepCreator, ShellScriptStepCreator};
use super::{PlanCreator, PlanKind, PlanTarget};

/// Read-only after construction; share it freely between compiles.
#[derive(Default)]
pub struct PlanCreatorRegistry {
    creators: IndexMap<PlanKind, Vec<Arc<dyn PlanCreator>>>,
}

impl PlanCreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in creator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(PipelineCreator)
            .register(StagesCreator)
            .register(DeploymentStageCreator)
            .register(ExecutionPhasesCreator)
            .register(PhaseCreator)
            .register(ParallelCreator)
            .register(ServiceCreator)
            .register(ArtifactForkCreator)
            .register(ArtifactStepCreator)
            .register(ManifestStepCreator)
            .register(InfraCreator)
            .register(HttpStepCreator)
            .register(K8sRollingStepCreator)
            .register(ShellScriptStepCreator);
        registry
    }

    pub fn register(&mut self, creator: impl PlanCreator + 'static) -> &mut Self {
        let creator: Arc<dyn PlanCreator> = Arc::new(creator);
        for kind in creator.supported_kinds() {
            self.creators.entry(*kind).or_default().push(Arc::clone(&creator));
        }
        self
    }

    pub fn creators_for(&self, kind: PlanKind) -> usize {
        self.creators.get(&kind).map_or(0, Vec::len)
    }

    /// Find the single creator for `target`.
    pub fn obtain(
        &self,
        target: &PlanTarget<'_>,
        context_message: &str,
    ) -> Result<&dyn PlanCreator, CompilerError> {
        let kind = target.kind();
        let candidates: Vec<&dyn PlanCreator> = self
            .creators
            .get(&kind)
            .map(|c| c.iter().map(|b| &**b).filter(|c| c.supports(target)).collect())
            .unwrap_or_default();

        match candidates.as_slice() {
            [] => Err(CompilerError::missing_creator(kind, context_message)),
            [creator] => {
                tracing::trace!(kind = %kind, creator = creator.name(), "dispatching plan creation");
                Ok(*creator)
            }
            many => {
                let names: Vec<&str> = many.iter().map(|c| c.name()).collect();
                Err(CompilerError::internal(
                    "C002",
                    format!(
                        "Multiple execution plan creators claim type {}: {}",
                        kind,
                        names.join(", ")
                    ),
                ))
            }
        }
    }
}
