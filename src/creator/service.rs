//! Service creator: a thin wrapper over the artifact fork and the manifest
//! step. `useFromStage` is resolved here so everything below sees a
//! concrete service.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::ServiceConfig;
use crate::plan::types::*;

use super::artifact::has_artifacts;
use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::manifest::has_manifests;
use super::overrides::resolve_service;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

pub struct ServiceCreator;

impl PlanCreator for ServiceCreator {
    fn name(&self) -> &'static str {
        "ServiceCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Service]
    }

    #[instrument(name = "creator::service", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Service(service) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let resolved = resolve_service(service, ctx)?;
        create_composite(self, &resolved, ctx)
    }
}

impl CompositePlanCreator for ServiceCreator {
    type Config = ServiceConfig;

    fn create_for_children(
        &self,
        service: &ServiceConfig,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let mut children = ChildPlans::new();
        if has_artifacts(service) {
            children.push(
                bucket::ARTIFACTS,
                ctx.create(
                    &PlanTarget::ArtifactFork(service),
                    "no execution plan creator found for service artifacts",
                )?,
            );
        }
        if has_manifests(service) {
            children.push(
                bucket::MANIFESTS,
                ctx.create(
                    &PlanTarget::Manifests(service),
                    "no execution plan creator found for service manifests",
                )?,
            );
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        service: &ServiceConfig,
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let parallel_node_ids: Vec<String> = [bucket::ARTIFACTS, bucket::MANIFESTS]
            .into_iter()
            .flat_map(|b| children.starting_node_ids(b))
            .collect();
        let facilitator = if parallel_node_ids.is_empty() {
            Facilitator::Sync
        } else {
            Facilitator::Children
        };

        let identifier = service.identifier.as_deref().unwrap_or("service");
        let node = PlanNode {
            group: Some(group::SERVICE.into()),
            ..PlanNode::new(
                service.name.as_deref().unwrap_or(identifier),
                identifier,
                step_type::SERVICE,
                StepParameters::Service(ServiceStepParameters {
                    identifier: service.identifier.clone(),
                    name: service.name.clone(),
                    description: service.description.clone(),
                    deployment_type: service
                        .service_definition
                        .as_ref()
                        .map(|d| d.deployment_type.clone()),
                    parallel_node_ids,
                }),
                facilitator,
            )
        };
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}
