//! Infrastructure creator.
//!
//! Emits the environment node, the infrastructure node and a section node
//! chaining the two. The infrastructure node's outcome is registered with the
//! step dependency service so deployment steps of the same stage can find it.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::PipelineInfrastructure;
use crate::plan::types::*;

use super::context::PlanCreationContext;
use super::dependency::{INFRASTRUCTURE_OUTCOME, infrastructure_key};
use super::overrides::resolve_infrastructure;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

pub struct InfraCreator;

impl PlanCreator for InfraCreator {
    fn name(&self) -> &'static str {
        "InfraCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Infrastructure]
    }

    #[instrument(name = "creator::infra", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Infrastructure(infrastructure) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let stage = ctx.current_stage().ok_or_else(|| {
            CompilerError::internal("C004", "Infrastructure compiled outside of a stage")
        })?;

        let PipelineInfrastructure {
            environment: Some(environment),
            infrastructure_definition: Some(definition),
            ..
        } = resolve_infrastructure(infrastructure, ctx)?
        else {
            return Err(CompilerError::invalid(
                "C024",
                format!(
                    "Stage '{}' must define both an environment and an infrastructure definition",
                    stage.identifier
                ),
                Some(stage.identifier.clone()),
            ));
        };

        let infra_node = PlanNode::new(
            format!("Infrastructure {}", definition.infra_type()),
            "infrastructure",
            step_type::INFRASTRUCTURE,
            StepParameters::Infrastructure(InfraStepParameters {
                environment_identifier: environment.identifier.clone(),
                infrastructure: definition,
            }),
            Facilitator::Sync,
        );
        let environment_node = PlanNode::new(
            environment.name.clone().unwrap_or_else(|| environment.identifier.clone()),
            "environment",
            step_type::ENVIRONMENT,
            StepParameters::Environment(EnvironmentStepParameters { environment }),
            Facilitator::Sync,
        );

        ctx.dependencies().register_instructor(
            &infrastructure_key(&stage.identifier),
            &infra_node.id,
            INFRASTRUCTURE_OUTCOME,
        );

        let section = PlanNode {
            group: Some(group::INFRASTRUCTURE.into()),
            ..PlanNode::new(
                "Infrastructure Section",
                "infrastructureSection",
                step_type::INFRASTRUCTURE_SECTION,
                StepParameters::SectionChain(SectionChainStepParameters {
                    child_node_ids: vec![environment_node.id.clone(), infra_node.id.clone()],
                }),
                Facilitator::ChildChain,
            )
        };

        Ok(CreateExecutionPlanResponse::compose(
            section,
            [
                CreateExecutionPlanResponse::leaf(environment_node),
                CreateExecutionPlanResponse::leaf(infra_node),
            ],
        ))
    }
}
