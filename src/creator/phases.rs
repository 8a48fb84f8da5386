//! Execution-phases creator: wraps the compiled phases of a deployment stage.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::Phase;
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::stages::wrap_children;
use super::{PlanCreator, PlanKind, PlanTarget, ensure_unique_identifiers, unexpected_target};

pub struct ExecutionPhasesCreator;

impl PlanCreator for ExecutionPhasesCreator {
    fn name(&self) -> &'static str {
        "ExecutionPhasesCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::ExecutionPhases]
    }

    #[instrument(name = "creator::execution_phases", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::ExecutionPhases(phases) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *phases, ctx)
    }
}

impl CompositePlanCreator for ExecutionPhasesCreator {
    type Config = [Phase];

    fn pre_plan_creation<'a>(
        &self,
        phases: &'a [Phase],
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        let stage = ctx.current_stage().map_or("<none>", |s| s.identifier.as_str());
        if phases.is_empty() {
            return Err(CompilerError::invalid(
                "C019",
                format!("Stage '{}' must contain at least one execution phase", stage),
                Some(stage.to_string()),
            ));
        }
        ensure_unique_identifiers(phases.iter().map(|p| p.identifier.as_str()), "phase", stage)?;
        Ok(*ctx)
    }

    fn create_for_children(
        &self,
        phases: &[Phase],
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let compiled = if ctx.options().multi_phase { phases } else { &phases[..1] };

        let mut children = ChildPlans::new();
        for phase in compiled {
            children.push(
                bucket::PHASES,
                ctx.create(&PlanTarget::Phase(phase), "no execution plan creator found for phase")?,
            );
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        _phases: &[Phase],
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let (parameters, facilitator) = wrap_children(children.starting_node_ids(bucket::PHASES));
        let node = PlanNode::new(
            "Execution",
            "execution",
            step_type::EXECUTION_PHASES,
            parameters,
            facilitator,
        );
        Ok(CreateExecutionPlanResponse::compose(node, children.into_responses()))
    }
}
