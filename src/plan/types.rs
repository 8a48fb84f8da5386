//! Plan graph type definitions.
//!
//! A compiled plan is a flat list of `PlanNode`s wired together by the node ids
//! stored in their `step_parameters`. Every creator returns a
//! `CreateExecutionPlanResponse` holding the nodes of its whole subtree and the
//! id its parent must use to enter it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::types::{
    ArtifactConfig, EnvironmentYaml, InfrastructureDef, ManifestConfig, ShellType,
};

// =============================================================================
// STEP TYPES
// =============================================================================

/// Runtime handler names. Opaque to the compiler beyond being copied onto nodes.
pub mod step_type {
    pub const PIPELINE_SETUP: &str = "PIPELINE_SETUP";
    pub const STAGES_STEP: &str = "STAGES_STEP";
    pub const DEPLOYMENT_STAGE_STEP: &str = "DEPLOYMENT_STAGE_STEP";
    pub const EXECUTION_PHASES: &str = "EXECUTION_PHASES_STEP";
    pub const SECTION_CHAIN: &str = "SECTION_CHAIN";
    pub const PHASE: &str = "PHASE";
    pub const FORK: &str = "FORK";
    pub const SERVICE: &str = "SERVICE";
    pub const ARTIFACT_STEP: &str = "ARTIFACT_STEP";
    pub const MANIFEST_STEP: &str = "MANIFEST_STEP";
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    pub const INFRASTRUCTURE: &str = "INFRASTRUCTURE";
    pub const INFRASTRUCTURE_SECTION: &str = "INFRASTRUCTURE_SECTION";
    pub const HTTP: &str = "Http";
    pub const K8S_ROLLING: &str = "K8sRollingDeploy";
    pub const SHELL_SCRIPT: &str = "ShellScript";
}

/// Reporting groups. Do not affect compilation.
pub mod group {
    pub const PIPELINE: &str = "PIPELINE";
    pub const STAGES: &str = "STAGES";
    pub const STAGE: &str = "STAGE";
    pub const PHASE: &str = "PHASE";
    pub const SERVICE: &str = "SERVICE";
    pub const INFRASTRUCTURE: &str = "INFRASTRUCTURE";
}

// =============================================================================
// PLAN NODE
// =============================================================================

/// Execution strategy the runtime applies to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facilitator {
    /// Dispatched to an external worker. No children.
    Task,
    /// Executed inline. No children.
    Sync,
    /// Exactly one child whose status becomes this node's status.
    Child,
    /// Ordered children, run one after another, stopping at the first failure.
    ChildChain,
    /// Unordered children, started together and joined.
    Children,
}

impl std::fmt::Display for Facilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Facilitator::Task => "TASK",
            Facilitator::Sync => "SYNC",
            Facilitator::Child => "CHILD",
            Facilitator::ChildChain => "CHILD_CHAIN",
            Facilitator::Children => "CHILDREN",
        };
        write!(f, "{}", s)
    }
}

/// A compiled graph vertex. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    /// Process-unique id, assigned at construction.
    pub id: String,
    pub name: String,
    /// Stable key, unique among siblings and identical across recompiles.
    pub identifier: String,
    pub step_type: String,
    pub step_parameters: StepParameters,
    pub facilitator: Facilitator,
    pub group: Option<String>,
    pub skip_expression_chain: bool,
}

impl PlanNode {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        step_type: &str,
        step_parameters: StepParameters,
        facilitator: Facilitator,
    ) -> Self {
        PlanNode {
            id: generate_node_id(),
            name: name.into(),
            identifier: identifier.into(),
            step_type: step_type.to_string(),
            step_parameters,
            facilitator,
            group: None,
            skip_expression_chain: false,
        }
    }
}

pub fn generate_node_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// STEP PARAMETERS — one variant per runtime handler payload
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepParameters {
    Child(ChildStepParameters),
    SectionChain(SectionChainStepParameters),
    Fork(ForkStepParameters),
    PipelineSetup(PipelineSetupStepParameters),
    DeploymentStage(DeploymentStageStepParameters),
    Phase(PhaseStepParameters),
    Service(ServiceStepParameters),
    Artifact(ArtifactStepParameters),
    Manifest(ManifestStepParameters),
    Environment(EnvironmentStepParameters),
    Infrastructure(InfraStepParameters),
    Http(HttpStepParameters),
    K8sRolling(K8sRollingStepParameters),
    ShellScript(ShellScriptStepParameters),
    /// Payload of an externally registered creator.
    Custom(CustomStepParameters),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildStepParameters {
    pub child_node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionChainStepParameters {
    pub child_node_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkStepParameters {
    pub parallel_node_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSetupStepParameters {
    pub identifier: String,
    pub name: Option<String>,
    pub child_node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStageStepParameters {
    pub identifier: String,
    pub name: String,
    /// Section name (`service`, `infrastructure`, `execution`) → entry node id.
    pub field_to_execution_node_id: IndexMap<String, String>,
    pub child_node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStepParameters {
    pub identifier: String,
    pub display_name: String,
    pub child_node_ids: Vec<String>,
    /// Entry of the compiled rollback chain. Not part of `child_node_ids`.
    pub rollback_node_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStepParameters {
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub deployment_type: Option<String>,
    pub parallel_node_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStepParameters {
    pub identifier: String,
    pub sidecar_identifier: Option<String>,
    pub artifact: ArtifactConfig,
    pub artifact_stage_override: Option<ArtifactConfig>,
    /// `artifact` with `artifact_stage_override` merged on top.
    pub resolved: ArtifactConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStepParameters {
    pub service_spec_manifests: Vec<ManifestConfig>,
    pub manifest_override_sets: Vec<ManifestConfig>,
    pub stage_override_manifests: Vec<ManifestConfig>,
    /// All sources merged by manifest identifier, later sources winning.
    pub resolved: Vec<ManifestConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStepParameters {
    pub environment: EnvironmentYaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraStepParameters {
    pub environment_identifier: String,
    pub infrastructure: InfrastructureDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStepParameters {
    pub url: String,
    pub method: String,
    pub headers: IndexMap<String, String>,
    pub request_body: Option<String>,
    pub socket_timeout_millis: Option<u64>,
}

/// Pointer to a value published by another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReference {
    pub key: String,
    pub producer_node_id: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sRollingStepParameters {
    pub skip_dry_run: bool,
    pub timeout: Option<String>,
    pub infrastructure: OutcomeReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellScriptStepParameters {
    pub shell: ShellType,
    pub script: String,
    pub on_delegate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStepParameters {
    pub payload: serde_json::Value,
    pub child_node_ids: Vec<String>,
}

impl StepParameters {
    /// Ids of the nodes this node executes, in execution order.
    pub fn child_node_ids(&self) -> Vec<&str> {
        match self {
            StepParameters::Child(p) => vec![p.child_node_id.as_str()],
            StepParameters::PipelineSetup(p) => vec![p.child_node_id.as_str()],
            StepParameters::DeploymentStage(p) => vec![p.child_node_id.as_str()],
            StepParameters::SectionChain(p) => p.child_node_ids.iter().map(String::as_str).collect(),
            StepParameters::Phase(p) => p.child_node_ids.iter().map(String::as_str).collect(),
            StepParameters::Fork(p) => p.parallel_node_ids.iter().map(String::as_str).collect(),
            StepParameters::Service(p) => p.parallel_node_ids.iter().map(String::as_str).collect(),
            StepParameters::Custom(p) => p.child_node_ids.iter().map(String::as_str).collect(),
            StepParameters::Artifact(_)
            | StepParameters::Manifest(_)
            | StepParameters::Environment(_)
            | StepParameters::Infrastructure(_)
            | StepParameters::Http(_)
            | StepParameters::K8sRolling(_)
            | StepParameters::ShellScript(_) => vec![],
        }
    }

    /// Children plus subtrees the runtime may enter on its own (rollback).
    pub fn structural_node_ids(&self) -> Vec<&str> {
        let mut ids = self.child_node_ids();
        if let StepParameters::Phase(p) = self {
            if let Some(rollback) = &p.rollback_node_id {
                ids.push(rollback.as_str());
            }
        }
        ids
    }

    /// Every node id mentioned anywhere in the payload.
    pub fn referenced_node_ids(&self) -> Vec<&str> {
        let mut ids = self.structural_node_ids();
        match self {
            StepParameters::DeploymentStage(p) => {
                ids.extend(p.field_to_execution_node_id.values().map(String::as_str));
            }
            StepParameters::K8sRolling(p) => ids.push(p.infrastructure.producer_node_id.as_str()),
            _ => {}
        }
        ids
    }
}

// =============================================================================
// CREATOR RESPONSES
// =============================================================================

/// Result of compiling one subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExecutionPlanResponse {
    /// The node created at this level.
    pub root_node: Option<PlanNode>,
    /// Every node of the subtree, children first.
    pub nodes: Vec<PlanNode>,
    pub starting_node_id: String,
}

impl CreateExecutionPlanResponse {
    /// Response for a node with no children.
    pub fn leaf(node: PlanNode) -> Self {
        CreateExecutionPlanResponse {
            root_node: Some(node.clone()),
            starting_node_id: node.id.clone(),
            nodes: vec![node],
        }
    }

    /// Response for `node` sitting on top of already compiled subtrees.
    pub fn compose(
        node: PlanNode,
        children: impl IntoIterator<Item = CreateExecutionPlanResponse>,
    ) -> Self {
        let mut nodes: Vec<PlanNode> = children.into_iter().flat_map(|c| c.nodes).collect();
        nodes.push(node.clone());
        CreateExecutionPlanResponse {
            starting_node_id: node.id.clone(),
            root_node: Some(node),
            nodes,
        }
    }
}

/// The final, flattened plan handed to the persistence/execution layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub starting_node_id: String,
    pub nodes: Vec<PlanNode>,
}

impl From<CreateExecutionPlanResponse> for ExecutionPlan {
    fn from(response: CreateExecutionPlanResponse) -> Self {
        ExecutionPlan {
            starting_node_id: response.starting_node_id,
            nodes: response.nodes,
        }
    }
}

impl ExecutionPlan {
    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn starting_node(&self) -> Option<&PlanNode> {
        self.node(&self.starting_node_id)
    }

    pub fn nodes_of_type<'a>(&'a self, step_type: &'a str) -> impl Iterator<Item = &'a PlanNode> + 'a {
        self.nodes.iter().filter(move |n| n.step_type == step_type)
    }

    pub fn node_by_identifier(&self, identifier: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.identifier == identifier)
    }

    /// Resolve a node's children to nodes, in parameter order.
    pub fn children_of(&self, node: &PlanNode) -> Vec<&PlanNode> {
        node.step_parameters
            .child_node_ids()
            .into_iter()
            .filter_map(|id| self.node(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_node(identifier: &str) -> PlanNode {
        PlanNode::new(
            identifier,
            identifier,
            step_type::SECTION_CHAIN,
            StepParameters::SectionChain(SectionChainStepParameters { child_node_ids: vec![] }),
            Facilitator::Sync,
        )
    }

    #[test]
    fn compose_puts_children_before_self() {
        let a = CreateExecutionPlanResponse::leaf(sync_node("a"));
        let b = CreateExecutionPlanResponse::leaf(sync_node("b"));
        let parent = sync_node("parent");
        let parent_id = parent.id.clone();

        let composed = CreateExecutionPlanResponse::compose(parent, [a, b]);
        let identifiers: Vec<&str> = composed.nodes.iter().map(|n| n.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["a", "b", "parent"]);
        assert_eq!(composed.starting_node_id, parent_id);
        assert_eq!(composed.root_node.map(|n| n.id), Some(parent_id));
    }

    #[test]
    fn node_ids_are_never_reused() {
        assert_ne!(sync_node("x").id, sync_node("x").id);
    }

    #[test]
    fn facilitator_serializes_screaming_snake() {
        let json = serde_json::to_string(&Facilitator::ChildChain).unwrap();
        assert_eq!(json, "\"CHILD_CHAIN\"");
    }
}
