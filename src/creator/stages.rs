//! Stages creator: wraps the compiled stages of a pipeline.
//!
//! One stage compiles to a `CHILD` node. Several stages are chained in
//! declaration order (`CHILD_CHAIN`) unless `PlanOptions::multi_stage` is off,
//! in which case only the first stage is compiled.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::Stage;
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, ensure_unique_identifiers, unexpected_target};

pub struct StagesCreator;

impl PlanCreator for StagesCreator {
    fn name(&self) -> &'static str {
        "StagesCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Stages]
    }

    #[instrument(name = "creator::stages", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Stages(stages) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *stages, ctx)
    }
}

impl CompositePlanCreator for StagesCreator {
    type Config = [Stage];

    fn pre_plan_creation<'a>(
        &self,
        stages: &'a [Stage],
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        let pipeline = ctx.pipeline()?;
        if stages.is_empty() {
            return Err(CompilerError::invalid(
                "C019",
                format!("Pipeline '{}' must contain at least one stage", pipeline.identifier),
                Some(pipeline.identifier.clone()),
            ));
        }
        ensure_unique_identifiers(
            stages.iter().map(|s| s.identifier.as_str()),
            "stage",
            &pipeline.identifier,
        )?;
        Ok(*ctx)
    }

    fn create_for_children(
        &self,
        stages: &[Stage],
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let compiled = if ctx.options().multi_stage { stages } else { &stages[..1] };

        let mut children = ChildPlans::new();
        for stage in compiled {
            children.push(
                bucket::STAGES,
                ctx.create(
                    &PlanTarget::Stage(stage),
                    "no execution plan creator found for stage execution",
                )?,
            );
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        _stages: &[Stage],
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let (parameters, facilitator) = wrap_children(children.starting_node_ids(bucket::STAGES));
        let node = PlanNode {
            group: Some(group::STAGES.into()),
            skip_expression_chain: true,
            ..PlanNode::new("stages", "stages", step_type::STAGES_STEP, parameters, facilitator)
        };
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}

/// `CHILD` over a single id, `CHILD_CHAIN` over several.
pub(crate) fn wrap_children(mut ids: Vec<String>) -> (StepParameters, Facilitator) {
    if ids.len() == 1 {
        let child_node_id = ids.remove(0);
        (
            StepParameters::Child(ChildStepParameters { child_node_id }),
            Facilitator::Child,
        )
    } else {
        (
            StepParameters::SectionChain(SectionChainStepParameters { child_node_ids: ids }),
            Facilitator::ChildChain,
        )
    }
}
