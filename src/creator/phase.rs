//! Phase creator: chains a phase's steps in declaration order.
//!
//! Rollback steps are compiled into their own `CHILD_CHAIN` node whose id is
//! recorded as `rollbackNodeId` on the phase. They are never part of the
//! phase's own chain; the runtime decides when (and whether) to enter them.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::{ExecutionWrapper, Phase};
use crate::plan::types::*;

use super::composite::{ChildPlans, CompositePlanCreator, bucket, create_composite};
use super::context::PlanCreationContext;
use super::{PlanCreator, PlanKind, PlanTarget, ensure_unique_identifiers, unexpected_target};

pub struct PhaseCreator;

impl PlanCreator for PhaseCreator {
    fn name(&self) -> &'static str {
        "PhaseCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Phase]
    }

    #[instrument(name = "creator::phase", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Phase(phase) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        create_composite(self, *phase, ctx)
    }
}

impl CompositePlanCreator for PhaseCreator {
    type Config = Phase;

    fn pre_plan_creation<'a>(
        &self,
        phase: &'a Phase,
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        if phase.steps.is_empty() {
            return Err(CompilerError::invalid(
                "C019",
                format!("Phase '{}' must contain at least one step", phase.identifier),
                Some(phase.identifier.clone()),
            ));
        }
        ensure_unique_identifiers(
            phase.steps.iter().flat_map(|w| w.steps()).map(|s| s.identifier.as_str()),
            "step",
            &phase.identifier,
        )?;
        ensure_unique_identifiers(
            phase.rollback_steps.iter().flat_map(|w| w.steps()).map(|s| s.identifier.as_str()),
            "rollback step",
            &phase.identifier,
        )?;
        Ok(ctx.with_phase(phase))
    }

    fn create_for_children(
        &self,
        phase: &Phase,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError> {
        let mut children = ChildPlans::new();
        for wrapper in &phase.steps {
            children.push(bucket::STEPS, create_wrapper(wrapper, ctx)?);
        }
        for wrapper in &phase.rollback_steps {
            children.push(bucket::ROLLBACK, create_wrapper(wrapper, ctx)?);
        }
        Ok(children)
    }

    fn create_for_self(
        &self,
        phase: &Phase,
        children: ChildPlans,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let rollback_ids = children.starting_node_ids(bucket::ROLLBACK);
        let rollback_chain = (!rollback_ids.is_empty()).then(|| {
            PlanNode::new(
                format!("{} Rollback", phase.display_name()),
                "rollback",
                step_type::SECTION_CHAIN,
                StepParameters::SectionChain(SectionChainStepParameters {
                    child_node_ids: rollback_ids,
                }),
                Facilitator::ChildChain,
            )
        });

        let node = PlanNode {
            group: Some(group::PHASE.into()),
            ..PlanNode::new(
                phase.display_name(),
                phase.identifier.as_str(),
                step_type::PHASE,
                StepParameters::Phase(PhaseStepParameters {
                    identifier: phase.identifier.clone(),
                    display_name: phase.display_name().to_string(),
                    child_node_ids: children.starting_node_ids(bucket::STEPS),
                    rollback_node_id: rollback_chain.as_ref().map(|n| n.id.clone()),
                }),
                Facilitator::ChildChain,
            )
        };

        let rollback = rollback_chain.map(CreateExecutionPlanResponse::leaf);
        Ok(CreateExecutionPlanResponse::compose(
            node,
            children.into_responses().chain(rollback),
        ))
    }
}

fn create_wrapper(
    wrapper: &ExecutionWrapper,
    ctx: &PlanCreationContext<'_>,
) -> Result<CreateExecutionPlanResponse, CompilerError> {
    match wrapper {
        ExecutionWrapper::Step(step) => {
            ctx.create(&PlanTarget::Step(step), "no execution plan creator found for step")
        }
        ExecutionWrapper::Parallel(steps) => ctx.create(
            &PlanTarget::Parallel(steps),
            "no execution plan creator found for parallel steps",
        ),
    }
}
