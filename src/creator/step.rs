//! Leaf step creators. Each emits one `TASK` node named after the step.

use tracing::instrument;

use crate::error::CompilerError;
use crate::pipeline::types::{StepElement, StepInfo};
use crate::plan::types::*;

use super::context::PlanCreationContext;
use super::dependency::infrastructure_key;
use super::{PlanCreator, PlanKind, PlanTarget, unexpected_target};

fn task(step: &StepElement, step_type: &str, params: StepParameters) -> CreateExecutionPlanResponse {
    CreateExecutionPlanResponse::leaf(PlanNode::new(
        step.display_name(),
        step.identifier.as_str(),
        step_type,
        params,
        Facilitator::Task,
    ))
}

pub struct HttpStepCreator;

impl PlanCreator for HttpStepCreator {
    fn name(&self) -> &'static str {
        "HttpStepCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Step]
    }

    fn supports(&self, target: &PlanTarget<'_>) -> bool {
        matches!(target, PlanTarget::Step(s) if matches!(s.spec, StepInfo::Http(_)))
    }

    #[instrument(name = "creator::step::http", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Step(step) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let StepInfo::Http(http) = &step.spec else {
            return Err(unexpected_target(self.name(), target));
        };
        Ok(task(
            step,
            step_type::HTTP,
            StepParameters::Http(HttpStepParameters {
                url: http.url.clone(),
                method: http.method.clone(),
                headers: http.headers.clone(),
                request_body: http.request_body.clone(),
                socket_timeout_millis: http.socket_timeout_millis,
            }),
        ))
    }
}

/// Rolling deployment. Needs the infrastructure of its stage, resolved
/// through the step dependency service.
pub struct K8sRollingStepCreator;

impl PlanCreator for K8sRollingStepCreator {
    fn name(&self) -> &'static str {
        "K8sRollingStepCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Step]
    }

    fn supports(&self, target: &PlanTarget<'_>) -> bool {
        matches!(target, PlanTarget::Step(s) if matches!(s.spec, StepInfo::K8sRollingDeploy(_)))
    }

    #[instrument(name = "creator::step::k8s_rolling", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Step(step) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let StepInfo::K8sRollingDeploy(rolling) = &step.spec else {
            return Err(unexpected_target(self.name(), target));
        };
        let stage = ctx.current_stage().ok_or_else(|| {
            CompilerError::internal("C004", "K8sRollingDeploy step compiled outside of a stage")
        })?;

        let key = infrastructure_key(&stage.identifier);
        let instructor = ctx.dependencies().instructor(&key).ok_or_else(|| {
            CompilerError::unresolvable(
                "C022",
                format!(
                    "Step '{}' needs infrastructure but stage '{}' registers none",
                    step.identifier, stage.identifier
                ),
                Some(step.identifier.clone()),
            )
        })?;

        Ok(task(
            step,
            step_type::K8S_ROLLING,
            StepParameters::K8sRolling(K8sRollingStepParameters {
                skip_dry_run: rolling.skip_dry_run,
                timeout: rolling.timeout.clone(),
                infrastructure: OutcomeReference {
                    key: instructor.key,
                    producer_node_id: instructor.producer_node_id,
                    outcome: instructor.outcome,
                },
            }),
        ))
    }
}

pub struct ShellScriptStepCreator;

impl PlanCreator for ShellScriptStepCreator {
    fn name(&self) -> &'static str {
        "ShellScriptStepCreator"
    }

    fn supported_kinds(&self) -> &'static [PlanKind] {
        &[PlanKind::Step]
    }

    fn supports(&self, target: &PlanTarget<'_>) -> bool {
        matches!(target, PlanTarget::Step(s) if matches!(s.spec, StepInfo::ShellScript(_)))
    }

    #[instrument(name = "creator::step::shell_script", level = "debug", skip_all)]
    fn create_plan(
        &self,
        target: &PlanTarget<'_>,
        _ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError> {
        let PlanTarget::Step(step) = target else {
            return Err(unexpected_target(self.name(), target));
        };
        let StepInfo::ShellScript(shell) = &step.spec else {
            return Err(unexpected_target(self.name(), target));
        };
        Ok(task(
            step,
            step_type::SHELL_SCRIPT,
            StepParameters::ShellScript(ShellScriptStepParameters {
                shell: shell.shell,
                script: shell.script.clone(),
                on_delegate: shell.on_delegate,
            }),
        ))
    }
}
