//! Two-phase skeleton shared by every creator with children:
//! compile children into named buckets, then build one node over them.

use indexmap::IndexMap;

use crate::error::CompilerError;
use crate::plan::types::CreateExecutionPlanResponse;

use super::context::PlanCreationContext;

/// Child bucket names.
pub mod bucket {
    pub const STAGES: &str = "STAGES";
    pub const SERVICE: &str = "SERVICE";
    pub const INFRASTRUCTURE: &str = "INFRASTRUCTURE";
    pub const EXECUTION: &str = "EXECUTION";
    pub const PHASES: &str = "PHASES";
    pub const STEPS: &str = "STEPS";
    pub const ROLLBACK: &str = "ROLLBACK";
    pub const ARTIFACTS: &str = "ARTIFACTS";
    pub const MANIFESTS: &str = "MANIFESTS";
}

/// Compiled children grouped by bucket, in insertion order.
#[derive(Debug, Default)]
pub struct ChildPlans {
    buckets: IndexMap<&'static str, Vec<CreateExecutionPlanResponse>>,
}

impl ChildPlans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: &'static str, response: CreateExecutionPlanResponse) {
        self.buckets.entry(bucket).or_default().push(response);
    }

    pub fn get(&self, bucket: &str) -> &[CreateExecutionPlanResponse] {
        self.buckets.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Starting node ids of a bucket, in compile order.
    pub fn starting_node_ids(&self, bucket: &str) -> Vec<String> {
        self.get(bucket).iter().map(|r| r.starting_node_id.clone()).collect()
    }

    /// The one response a bucket must hold.
    pub fn single(&self, bucket: &str) -> Result<&CreateExecutionPlanResponse, CompilerError> {
        match self.get(bucket) {
            [only] => Ok(only),
            other => Err(CompilerError::internal(
                "C005",
                format!("Expected exactly one {} plan, found {}", bucket, other.len()),
            )),
        }
    }

    /// Every child response, bucket by bucket.
    pub fn into_responses(self) -> impl Iterator<Item = CreateExecutionPlanResponse> {
        self.buckets.into_values().flatten()
    }
}

pub trait CompositePlanCreator {
    type Config: ?Sized;

    /// Extend the context before any child is compiled.
    fn pre_plan_creation<'a>(
        &self,
        _config: &'a Self::Config,
        ctx: &PlanCreationContext<'a>,
    ) -> Result<PlanCreationContext<'a>, CompilerError> {
        Ok(*ctx)
    }

    fn create_for_children(
        &self,
        config: &Self::Config,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<ChildPlans, CompilerError>;

    /// Build this level's node. The response must hold every child node.
    fn create_for_self(
        &self,
        config: &Self::Config,
        children: ChildPlans,
        ctx: &PlanCreationContext<'_>,
    ) -> Result<CreateExecutionPlanResponse, CompilerError>;
}

pub fn create_composite<C>(
    creator: &C,
    config: &C::Config,
    ctx: &PlanCreationContext<'_>,
) -> Result<CreateExecutionPlanResponse, CompilerError>
where
    C: CompositePlanCreator + ?Sized,
{
    let scoped = creator.pre_plan_creation(config, ctx)?;
    let children = creator.create_for_children(config, &scoped)?;
    let response = creator.create_for_self(config, children, &scoped)?;
    if let Some(node) = &response.root_node {
        tracing::debug!(
            identifier = %node.identifier,
            step_type = %node.step_type,
            facilitator = %node.facilitator,
            nodes = response.nodes.len(),
            "created plan node"
        );
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::types::*;

    fn leaf(identifier: &str) -> CreateExecutionPlanResponse {
        CreateExecutionPlanResponse::leaf(PlanNode::new(
            identifier,
            identifier,
            step_type::HTTP,
            StepParameters::Http(HttpStepParameters {
                url: "https://example.com".into(),
                method: "GET".into(),
                headers: Default::default(),
                request_body: None,
                socket_timeout_millis: None,
            }),
            Facilitator::Task,
        ))
    }

    #[test]
    fn buckets_keep_their_own_order() {
        let mut children = ChildPlans::new();
        let a = leaf("a");
        let b = leaf("b");
        let r = leaf("r");
        let (a_id, b_id) = (a.starting_node_id.clone(), b.starting_node_id.clone());
        children.push(bucket::STEPS, a);
        children.push(bucket::ROLLBACK, r);
        children.push(bucket::STEPS, b);

        assert_eq!(children.starting_node_ids(bucket::STEPS), vec![a_id, b_id]);
        assert_eq!(children.get(bucket::ROLLBACK).len(), 1);
        assert!(children.get(bucket::ARTIFACTS).is_empty());
        assert_eq!(children.into_responses().count(), 3);
    }

    #[test]
    fn single_rejects_missing_bucket() {
        let children = ChildPlans::new();
        let err = children.single(bucket::EXECUTION).unwrap_err();
        assert_eq!(err.code, "C005");
    }
}
