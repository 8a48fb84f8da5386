//! Deployment stage creator.
//!
//! Children are compiled in runtime order: service, infrastructure, then the
//! execution phases. The infrastructure must come before execution so that
//! steps needing it can resolve its outcome. When only execution exists the
//! stage wraps it directly; otherwise the sections are chained under a
//! `SECTION_CHAIN` node and the stage wraps that.

use indexmap::IndexMap;
use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::{DeploymentStage, Stage};
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

pub struct DeploymentStageCreator;

impl PlanCreator for DeploymentStageCreator {
    fn name(&self) -> &'static str {
        "DeploymentStageCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Stage]
    }

    fn supports(&self, target: &PlanTarget<'_>) -> bool {
        matches!(target, PlanTarget::Stage(stage) if stage.as_deployment().is_some())
    }

    #[instrument(name = "creator::stage", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Stage(stage) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *stage, ctx)
    }
}

fn deployment(stage: &Stage) -> Result<&DeploymentStage, CompilerError> {
    stage.as_deployment().ok_or_else(|| {
        CompilerError::internal(
            "C003",
            format!("Stage '{}' is not a deployment stage", stage.identifier),
        )
    })
}

impl CompositePlanCreator for DeploymentStageCreator {
    type Config = Stage;

    fn pre_plan_creation<'a>(
        &self,
        stage: &'a Stage,
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        Ok(ctx.with_stage(stage))
    }

    fn create_for_children(
        &self,
        stage: &Stage,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let deployment = deployment(stage)?;
        let mut children = ChildPlans::new();

        if let Some(service) = &deployment.service {
            children.push(
                bucket::SERVICE,
                ctx.create(&PlanTarget::Service(service), "no execution plan creator found for service")?,
            );
        }
        if let Some(infrastructure) = &deployment.infrastructure {
            children.push(
                bucket::INFRASTRUCTURE,
                ctx.create(
                    &PlanTarget::Infrastructure(infrastructure),
                    "no execution plan creator found for infrastructure",
                )?,
            );
        }
        children.push(
            bucket::EXECUTION,
            ctx.create(
                &PlanTarget::ExecutionPhases(&deployment.phases),
                "no execution plan creator found for stage execution",
            )?,
        );

        Ok(children)
    }

    fn create_for_self(
        &self,
        stage: &Stage,
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let mut field_to_execution_node_id = IndexMap::new();
        for (field, section_bucket) in [
            ("service", bucket::SERVICE),
            ("infrastructure", bucket::INFRASTRUCTURE),
            ("execution", bucket::EXECUTION),
        ] {
            if let Some(section) = children.get(section_bucket).first() {
                field_to_execution_node_id.insert(field.to_string(), section.starting_node_id.clone());
            }
        }
        let execution_id = children.single(bucket::EXECUTION)?.starting_node_id.clone();

        let section_chain = (field_to_execution_node_id.len() > 1).then(|| {
            PlanNode::new(
                format!("{} Sections", stage.display_name()),
                "sections",
                step_type::SECTION_CHAIN,
                StepParameters::SectionChain(SectionChainStepParameters {
                    child_node_ids: field_to_execution_node_id.values().cloned().collect(),
                }),
                Facilitator::ChildChain,
            )
        });
        let child_node_id = section_chain.as_ref().map_or(execution_id, |n| n.id.clone());

        let node = PlanNode {
            group: Some(group::STAGE.into()),
            ..PlanNode::new(
                stage.display_name(),
                stage.identifier.as_str(),
                step_type::DEPLOYMENT_STAGE_STEP,
                StepParameters::DeploymentStage(DeploymentStageStepParameters {
                    identifier: stage.identifier.clone(),
                    name: stage.display_name().to_string(),
                    field_to_execution_node_id,
                    child_node_id,
                }),
                Facilitator::Child,
            )
        };

        let sections = section_chain.map(CreateExecutionPlanResponse::leaf);
        Ok(CreateExecutionPlanResponse::compose(
            node,
            children.into_responses().chain(sections),
        ))
    }
}
