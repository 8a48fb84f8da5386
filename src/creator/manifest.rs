//! Manifest step creator.
//!
//! Gathers the service's manifests, the manifests of every override set the
//! stage asks for, and the stage's own manifest overrides into one `SYNC` node.
//! `resolved` holds the merged view: entries are matched by identifier and a
//! later layer replaces an earlier one.

use indexmap::IndexMap;
use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::{ManifestConfig, ServiceConfig};
use crate::plan::types::*;

use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, ensure_unique_identifiers, unexpected_target};

/// Whether a service contributes a manifest step.
pub(crate) fn has_manifests(service: &ServiceConfig) -> bool {
    let declared = service.service_spec().is_some_and(|s| !s.manifests.is_empty());
    let overridden = service
        .stage_overrides
        .as_ref()
        .is_some_and(|o| !o.manifests.is_empty() || !o.use_manifest_override_sets.is_empty());
    declared || overridden
}

/// Concatenate the manifests of each requested override set, in request order.
pub fn override_set_manifests(service: &ServiceConfig) -> Result<Vec<ManifestConfig>, CompilerError> {
    let requested = service
        .stage_overrides
        .as_ref()
        .map(|o| o.use_manifest_override_sets.as_slice())
        .unwrap_or(&[]);
    let defined = service
        .service_spec()
        .map(|s| s.manifest_override_sets.as_slice())
        .unwrap_or(&[]);

    let mut manifests = Vec::new();
    for identifier in requested {
        let set = defined.iter().find(|s| &s.identifier == identifier).ok_or_else(|| {
            CompilerError::invalid(
                "C012",
                format!("Manifest Override Set is not defined: {}", identifier),
                Some(identifier.clone()),
            )
        })?;
        ensure_unique_manifests(&set.manifests, &set.identifier)?;
        manifests.extend(set.manifests.iter().cloned());
    }
    Ok(manifests)
}

/// Manifest identifiers must be distinct within one source.
fn ensure_unique_manifests(manifests: &[ManifestConfig], source: &str) -> Result<(), CompilerError> {
    ensure_unique_identifiers(manifests.iter().map(|m| m.identifier.as_str()), "manifest", source)
        .map_err(|e| CompilerError { code: "C023".into(), ..e })
}

fn merge_by_identifier<'a>(layers: impl IntoIterator<Item = &'a [ManifestConfig]>) -> Vec<ManifestConfig> {
    let mut merged: IndexMap<&str, &ManifestConfig> = IndexMap::new();
    for manifest in layers.into_iter().flatten() {
        merged.insert(manifest.identifier.as_str(), manifest);
    }
    merged.into_values().cloned().collect()
}

pub struct ManifestStepCreator;

impl PlanCreator for ManifestStepCreator {
    fn name(&self) -> &'static str {
        "ManifestStepCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Manifests]
    }

    #[instrument(name = "creator::manifest", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Manifests(service) = target else {
            return Err(unexpected_target(self.name(), target));
        };

        let service_spec_manifests = service
            .service_spec()
            .map(|s| s.manifests.clone())
            .unwrap_or_default();
        let owner = service.identifier.as_deref().unwrap_or("service");
        ensure_unique_manifests(&service_spec_manifests, owner)?;

        let manifest_override_sets = override_set_manifests(service)?;
        let stage_override_manifests = service
            .stage_overrides
            .as_ref()
            .map(|o| o.manifests.clone())
            .unwrap_or_default();
        ensure_unique_manifests(&stage_override_manifests, "stageOverrides")?;

        let resolved = merge_by_identifier([
            service_spec_manifests.as_slice(),
            manifest_override_sets.as_slice(),
            stage_override_manifests.as_slice(),
        ]);

        let node = PlanNode::new(
            "Manifests",
            "manifests",
            step_type::MANIFEST_STEP,
            StepParameters::Manifest(ManifestStepParameters {
                service_spec_manifests,
                manifest_override_sets,
                stage_override_manifests,
                resolved,
            }),
            Facilitator::Sync,
        );
        Ok(CreateExecutionPlanResponse::leaf(node))
    }
}
