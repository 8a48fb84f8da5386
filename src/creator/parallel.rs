//! Parallel block creator: forks a group of steps inside a phase.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::StepElement;
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

pub struct ParallelCreator;

impl PlanCreator for ParallelCreator {
    fn name(&self) -> &'static str {
        "ParallelCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Parallel]
    }

    #[instrument(name = "creator::parallel", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Parallel(steps) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *steps, ctx)
    }
}

impl CompositePlanCreator for ParallelCreator {
    type Config = [StepElement];

    fn create_for_children(
        &self,
        steps: &[StepElement],
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        if steps.is_empty() {
            let phase = ctx.current_phase().map(|p| p.identifier.clone());
            return Err(CompilerError::invalid(
                "C019",
                format!(
                    "Parallel block in phase '{}' must contain at least one step",
                    phase.as_deref().unwrap_or("<none>")
                ),
                phase,
            ));
        }

        let mut children = ChildPlans::new();
        for step in steps {
            children.push(
                bucket::STEPS,
                ctx.create(&PlanTarget::Step(step), "no execution plan creator found for step")?,
            );
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        steps: &[StepElement],
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let identifier = steps
            .first()
            .map_or_else(|| "parallel".to_string(), |s| format!("parallel.{}", s.identifier));
        let node = PlanNode::new(
            "Parallel",
            identifier,
            step_type::FORK,
            StepParameters::Fork(ForkStepParameters {
                parallel_node_ids: children.starting_node_ids(bucket::STEPS),
            }),
            Facilitator::Children,
        );
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}
