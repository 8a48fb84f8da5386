//! Pipeline creator: the root of every plan.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::Pipeline;
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

pub struct PipelineCreator;

impl PlanCreator for PipelineCreator {
    fn name(&self) -> &'static str {
        "PipelineCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Pipeline]
    }

    #[instrument(name = "creator::pipeline", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Pipeline(pipeline) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *pipeline, ctx)
    }
}

impl CompositePlanCreator for PipelineCreator {
    type Config = Pipeline;

    fn pre_plan_creation<'a>(
        &self,
        pipeline: &'a Pipeline,
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        Ok(ctx.with_pipeline(pipeline))
    }

    fn create_for_children(
        &self,
        pipeline: &Pipeline,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let mut children = ChildPlans::new();
        children.push(
            bucket::STAGES,
            ctx.create(
                &PlanTarget::Stages(&pipeline.stages),
                "no execution plan creator found for pipeline stages",
            )?,
        );
        Ok(children)
    }

    fn create_for_self(
        &self,
        pipeline: &Pipeline,
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let stages = children.single(bucket::STAGES)?;
        let node = PlanNode {
            group: Some(group::PIPELINE.into()),
            skip_expression_chain: true,
            ..PlanNode::new(
                pipeline.name.as_deref().unwrap_or(&pipeline.identifier),
                pipeline.identifier.as_str(),
                step_type::PIPELINE_SETUP,
                StepParameters::PipelineSetup(PipelineSetupStepParameters {
                    identifier: pipeline.identifier.clone(),
                    name: pipeline.name.clone(),
                    child_node_id: stages.starting_node_id.clone(),
                }),
                Facilitator::Child,
            )
        };
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}
