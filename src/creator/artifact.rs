//! Artifact fork and artifact step creators.
//!
//! The fork builds one keyed entry per artifact of the service: the primary is
//! keyed by its artifact type, each sidecar by `type.identifier`. Overrides are
//! keyed the same way and attached to the matching base entry. The fork then
//! compiles one `ARTIFACT_STEP` per entry and runs them concurrently.

use indexmap::IndexMap;
use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::*;
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

/// One artifact of a service, keyed, with the stage override attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub key: String,
    pub sidecar_identifier: Option<String>,
    pub artifact: ArtifactConfig,
    pub stage_override: Option<ArtifactConfig>,
}

impl ArtifactSource {
    /// The artifact with its override merged in.
    pub fn resolved(&self) -> ArtifactConfig {
        self.stage_override
            .as_ref()
            .and_then(|over| self.artifact.apply_override(over))
            .unwrap_or_else(|| self.artifact.clone())
    }
}

/// Whether a service contributes anything to an artifact fork.
pub(crate) fn has_artifacts(service: &ServiceConfig) -> bool {
    let declared = service.artifacts().is_some_and(|a| !is_empty(a));
    let overridden = service.stage_overrides.as_ref().is_some_and(|o| {
        o.artifacts.as_ref().is_some_and(|a| !is_empty(a)) || !o.use_artifact_override_sets.is_empty()
    });
    declared || overridden
}

fn is_empty(list: &ArtifactListConfig) -> bool {
    list.primary.is_none() && list.sidecars.is_empty()
}

fn artifact_key(artifact: &ArtifactConfig, sidecar_identifier: Option<&str>) -> String {
    match sidecar_identifier {
        Some(identifier) => format!("{}.{}", artifact.artifact_type(), identifier),
        None => artifact.artifact_type().to_string(),
    }
}

/// Key every artifact of a list. A repeated key is fatal.
fn keyed_artifacts(list: &ArtifactListConfig) -> Result<IndexMap<String, (Option<String>, ArtifactConfig)>, CompilerError> {
    let mut map = IndexMap::new();
    if let Some(primary) = &list.primary {
        map.insert(artifact_key(primary, None), (None, primary.clone()));
    }
    for sidecar in &list.sidecars {
        let key = artifact_key(&sidecar.spec, Some(&sidecar.identifier));
        if map.contains_key(&key) {
            return Err(CompilerError::invalid(
                "C011",
                format!("same identifier sidecar occurring multiple times: {}", key),
                Some(key),
            ));
        }
        map.insert(key, (Some(sidecar.identifier.clone()), sidecar.spec.clone()));
    }
    Ok(map)
}

/// Override layers in application order: named sets as listed, then the
/// stage's explicit overrides. Later layers win field by field.
fn stage_overrides(service: &ServiceConfig) -> Result<IndexMap<String, ArtifactConfig>, CompilerError> {
    let Some(overrides) = &service.stage_overrides else {
        return Ok(IndexMap::new());
    };
    let defined_sets = service
        .service_spec()
        .map(|s| s.artifact_override_sets.as_slice())
        .unwrap_or(&[]);

    let mut layers = Vec::new();
    for identifier in &overrides.use_artifact_override_sets {
        let set = defined_sets.iter().find(|s| &s.identifier == identifier).ok_or_else(|| {
            CompilerError::invalid(
                "C013",
                format!("Artifact Override Set is not defined: {}", identifier),
                Some(identifier.clone()),
            )
        })?;
        layers.push(&set.artifacts);
    }
    layers.extend(overrides.artifacts.as_ref());

    let mut merged: IndexMap<String, ArtifactConfig> = IndexMap::new();
    for layer in layers {
        for (key, (_, artifact)) in keyed_artifacts(layer)? {
            // Same key means same artifact type, so the merge always applies.
            let value = merged
                .get(&key)
                .and_then(|earlier| earlier.apply_override(&artifact))
                .unwrap_or(artifact);
            merged.insert(key, value);
        }
    }
    Ok(merged)
}

/// Build the keyed artifact entries of a service with overrides attached.
pub fn artifact_sources(service: &ServiceConfig) -> Result<Vec<ArtifactSource>, CompilerError> {
    let base = service.artifacts().cloned().unwrap_or_default();
    if base.primary.is_none() {
        return Err(CompilerError::invalid(
            "C010",
            "Primary artifact cannot be null when artifacts or artifact overrides are present",
            service.identifier.clone(),
        ));
    }

    let base = keyed_artifacts(&base)?;
    let mut overrides = stage_overrides(service)?;

    let sources = base
        .into_iter()
        .map(|(key, (sidecar_identifier, artifact))| ArtifactSource {
            stage_override: overrides.shift_remove(&key),
            key,
            sidecar_identifier,
            artifact,
        })
        .collect();

    for key in overrides.keys() {
        tracing::trace!(key = %key, "artifact override has no matching artifact, ignoring");
    }
    Ok(sources)
}

// =============================================================================
// ARTIFACT FORK
// =============================================================================

pub struct ArtifactForkCreator;

impl PlanCreator for ArtifactForkCreator {
    fn name(&self) -> &'static str {
        "ArtifactForkCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::ArtifactFork]
    }

    #[instrument(name = "creator::artifact_fork", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::ArtifactFork(service) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *service, ctx)
    }
}

impl CompositePlanCreator for ArtifactForkCreator {
    type Config = ServiceConfig;

    fn create_for_children(
        &self,
        service: &ServiceConfig,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let mut children = ChildPlans::new();
        for source in artifact_sources(service)? {
            children.push(
                bucket::ARTIFACTS,
                ctx.create(
                    &PlanTarget::ArtifactStep(&source),
                    "no execution plan creator found for artifact",
                )?,
            );
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        _service: &ServiceConfig,
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let node = PlanNode::new(
            "Artifacts",
            "artifacts",
            step_type::FORK,
            StepParameters::Fork(ForkStepParameters {
                parallel_node_ids: children.starting_node_ids(bucket::ARTIFACTS),
            }),
            Facilitator::Children,
        );
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}

// =============================================================================
// ARTIFACT STEP
// =============================================================================

pub struct ArtifactStepCreator;

impl PlanCreator for ArtifactStepCreator {
    fn name(&self) -> &'static str {
        "ArtifactStepCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::ArtifactStep]
    }

    #[instrument(name = "creator::artifact_step", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::ArtifactStep(source) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let node = PlanNode::new(
            source.key.as_str(),
            source.key.as_str(),
            step_type::ARTIFACT_STEP,
            StepParameters::Artifact(ArtifactStepParameters {
                identifier: source.key.clone(),
                sidecar_identifier: source.sidecar_identifier.clone(),
                artifact: source.artifact.clone(),
                artifact_stage_override: source.stage_override.clone(),
                resolved: source.resolved(),
            }),
            Facilitator::Task,
        );
        Ok(CreateExecutionPlanResponse::leaf(node))
    }
}
