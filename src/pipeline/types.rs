//! Source configuration objects for a deployment pipeline.
//!
//! These are the serde targets for an already-validated pipeline definition.
//! They are read-only for the whole compile: creators borrow them, resolve
//! overrides into fresh owned values, and never write back.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// PIPELINE / STAGES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Look up a stage by identifier.
    pub fn stage(&self, identifier: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.identifier == identifier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub spec: StageType,
}

impl Stage {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }

    pub fn as_deployment(&self) -> Option<&DeploymentStage> {
        match &self.spec {
            StageType::Deployment(d) => Some(d),
            StageType::Custom(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageType {
    Deployment(DeploymentStage),
    /// A stage kind contributed by an externally registered creator.
    Custom(CustomStage),
}

impl StageType {
    pub fn type_name(&self) -> &str {
        match self {
            StageType::Deployment(_) => "Deployment",
            StageType::Custom(c) => &c.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStage {
    #[serde(default)]
    pub service: Option<ServiceConfig>,
    #[serde(default)]
    pub infrastructure: Option<PipelineInfrastructure>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStage {
    pub kind: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

// =============================================================================
// PHASES / STEPS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub steps: Vec<ExecutionWrapper>,
    #[serde(default)]
    pub rollback_steps: Vec<ExecutionWrapper>,
}

impl Phase {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

/// One entry of a phase's step list: a single step or a parallel block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionWrapper {
    Step(StepElement),
    Parallel(Vec<StepElement>),
}

impl ExecutionWrapper {
    /// Every step element held by this wrapper, in declaration order.
    pub fn steps(&self) -> &[StepElement] {
        match self {
            ExecutionWrapper::Step(s) => std::slice::from_ref(s),
            ExecutionWrapper::Parallel(steps) => steps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepElement {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub spec: StepInfo,
}

impl StepElement {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StepInfo {
    Http(HttpStepInfo),
    K8sRollingDeploy(K8sRollingStepInfo),
    ShellScript(ShellScriptStepInfo),
}

impl StepInfo {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepInfo::Http(_) => "Http",
            StepInfo::K8sRollingDeploy(_) => "K8sRollingDeploy",
            StepInfo::ShellScript(_) => "ShellScript",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStepInfo {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub socket_timeout_millis: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sRollingStepInfo {
    #[serde(default)]
    pub skip_dry_run: bool,
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellScriptStepInfo {
    pub shell: ShellType,
    pub script: String,
    #[serde(default)]
    pub on_delegate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellType {
    Bash,
    PowerShell,
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub service_definition: Option<ServiceDefinition>,
    #[serde(default)]
    pub use_from_stage: Option<ServiceUseFromStage>,
    #[serde(default)]
    pub stage_overrides: Option<StageOverridesConfig>,
}

impl ServiceConfig {
    pub fn service_spec(&self) -> Option<&ServiceSpec> {
        self.service_definition.as_ref().map(|d| &d.spec)
    }

    pub fn artifacts(&self) -> Option<&ArtifactListConfig> {
        self.service_spec().and_then(|s| s.artifacts.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    #[serde(rename = "type")]
    pub deployment_type: String,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default)]
    pub artifacts: Option<ArtifactListConfig>,
    #[serde(default)]
    pub manifests: Vec<ManifestConfig>,
    #[serde(default)]
    pub manifest_override_sets: Vec<ManifestOverrideSet>,
    #[serde(default)]
    pub artifact_override_sets: Vec<ArtifactOverrideSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUseFromStage {
    pub stage: String,
    #[serde(default)]
    pub overrides: Option<ServiceOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Stage-local overrides applied on top of the service definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOverridesConfig {
    #[serde(default)]
    pub artifacts: Option<ArtifactListConfig>,
    #[serde(default)]
    pub manifests: Vec<ManifestConfig>,
    #[serde(default)]
    pub use_manifest_override_sets: Vec<String>,
    #[serde(default)]
    pub use_artifact_override_sets: Vec<String>,
}

// =============================================================================
// ARTIFACTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactListConfig {
    #[serde(default)]
    pub primary: Option<ArtifactConfig>,
    #[serde(default)]
    pub sidecars: Vec<SidecarArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarArtifact {
    pub identifier: String,
    pub spec: ArtifactConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactOverrideSet {
    pub identifier: String,
    pub artifacts: ArtifactListConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArtifactConfig {
    Dockerhub(DockerHubArtifactConfig),
    Gcr(GcrArtifactConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerHubArtifactConfig {
    #[serde(default)]
    pub connector_ref: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub tag_regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcrArtifactConfig {
    #[serde(default)]
    pub connector_ref: Option<String>,
    #[serde(default)]
    pub registry_hostname: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub tag_regex: Option<String>,
}

impl ArtifactConfig {
    pub fn artifact_type(&self) -> &'static str {
        match self {
            ArtifactConfig::Dockerhub(_) => "Dockerhub",
            ArtifactConfig::Gcr(_) => "Gcr",
        }
    }

    /// Field-level merge: every field set on `over` replaces the same field
    /// here. Returns `None` when the two artifacts are of different types.
    pub fn apply_override(&self, over: &ArtifactConfig) -> Option<ArtifactConfig> {
        match (self, over) {
            (ArtifactConfig::Dockerhub(base), ArtifactConfig::Dockerhub(o)) => {
                Some(ArtifactConfig::Dockerhub(DockerHubArtifactConfig {
                    connector_ref: pick(&o.connector_ref, &base.connector_ref),
                    image_path: pick(&o.image_path, &base.image_path),
                    tag: pick(&o.tag, &base.tag),
                    tag_regex: pick(&o.tag_regex, &base.tag_regex),
                }))
            }
            (ArtifactConfig::Gcr(base), ArtifactConfig::Gcr(o)) => {
                Some(ArtifactConfig::Gcr(GcrArtifactConfig {
                    connector_ref: pick(&o.connector_ref, &base.connector_ref),
                    registry_hostname: pick(&o.registry_hostname, &base.registry_hostname),
                    image_path: pick(&o.image_path, &base.image_path),
                    tag: pick(&o.tag, &base.tag),
                    tag_regex: pick(&o.tag_regex, &base.tag_regex),
                }))
            }
            _ => None,
        }
    }
}

// =============================================================================
// MANIFESTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestConfig {
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: ManifestKind,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestKind {
    K8sManifest,
    Values,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    Git(GitStore),
    Local(LocalStore),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitStore {
    pub connector_ref: String,
    pub fetch_type: FetchType,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchType {
    Branch,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStore {
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOverrideSet {
    pub identifier: String,
    #[serde(default)]
    pub manifests: Vec<ManifestConfig>,
}

// =============================================================================
// INFRASTRUCTURE
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfrastructure {
    #[serde(default)]
    pub environment: Option<EnvironmentYaml>,
    #[serde(default)]
    pub infrastructure_definition: Option<InfrastructureDef>,
    #[serde(default)]
    pub use_from_stage: Option<InfraUseFromStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentYaml {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub env_type: EnvironmentType,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentType {
    PreProduction,
    Production,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentOverrides {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub env_type: Option<EnvironmentType>,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
}

impl EnvironmentYaml {
    pub fn apply_overrides(&self, over: &EnvironmentOverrides) -> EnvironmentYaml {
        let mut tags = self.tags.clone();
        tags.extend(over.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        EnvironmentYaml {
            identifier: over.identifier.clone().unwrap_or_else(|| self.identifier.clone()),
            name: pick(&over.name, &self.name),
            env_type: over.env_type.unwrap_or(self.env_type),
            tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InfrastructureDef {
    KubernetesDirect(K8sDirectInfrastructure),
    KubernetesGcp(K8sGcpInfrastructure),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sDirectInfrastructure {
    #[serde(default)]
    pub connector_ref: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub release_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sGcpInfrastructure {
    #[serde(default)]
    pub connector_ref: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub release_name: Option<String>,
}

impl InfrastructureDef {
    pub fn infra_type(&self) -> &'static str {
        match self {
            InfrastructureDef::KubernetesDirect(_) => "KubernetesDirect",
            InfrastructureDef::KubernetesGcp(_) => "KubernetesGcp",
        }
    }

    /// Field-level merge, same rules as [`ArtifactConfig::apply_override`].
    pub fn apply_override(&self, over: &InfrastructureDef) -> Option<InfrastructureDef> {
        match (self, over) {
            (InfrastructureDef::KubernetesDirect(base), InfrastructureDef::KubernetesDirect(o)) => {
                Some(InfrastructureDef::KubernetesDirect(K8sDirectInfrastructure {
                    connector_ref: pick(&o.connector_ref, &base.connector_ref),
                    namespace: pick(&o.namespace, &base.namespace),
                    release_name: pick(&o.release_name, &base.release_name),
                }))
            }
            (InfrastructureDef::KubernetesGcp(base), InfrastructureDef::KubernetesGcp(o)) => {
                Some(InfrastructureDef::KubernetesGcp(K8sGcpInfrastructure {
                    connector_ref: pick(&o.connector_ref, &base.connector_ref),
                    cluster: pick(&o.cluster, &base.cluster),
                    namespace: pick(&o.namespace, &base.namespace),
                    release_name: pick(&o.release_name, &base.release_name),
                }))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraUseFromStage {
    pub stage: String,
    #[serde(default)]
    pub overrides: Option<InfraOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraOverrides {
    #[serde(default)]
    pub environment: Option<EnvironmentOverrides>,
    #[serde(default)]
    pub infrastructure_definition: Option<InfrastructureDef>,
}

fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
    over.clone().or_else(|| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_override_replaces_only_named_fields() {
        let base = ArtifactConfig::Dockerhub(DockerHubArtifactConfig {
            connector_ref: Some("docker-conn".into()),
            image_path: Some("library/nginx".into()),
            tag: Some("1.0".into()),
            tag_regex: None,
        });
        let over = ArtifactConfig::Dockerhub(DockerHubArtifactConfig {
            image_path: Some("library/httpd".into()),
            ..Default::default()
        });
        let merged = base.apply_override(&over).unwrap();
        assert_eq!(
            merged,
            ArtifactConfig::Dockerhub(DockerHubArtifactConfig {
                connector_ref: Some("docker-conn".into()),
                image_path: Some("library/httpd".into()),
                tag: Some("1.0".into()),
                tag_regex: None,
            })
        );
    }

    #[test]
    fn artifact_override_of_other_type_does_not_merge() {
        let base = ArtifactConfig::Dockerhub(DockerHubArtifactConfig::default());
        let over = ArtifactConfig::Gcr(GcrArtifactConfig::default());
        assert!(base.apply_override(&over).is_none());
    }

    #[test]
    fn environment_override_merges_tags() {
        let env = EnvironmentYaml {
            identifier: "qa".into(),
            name: Some("QA".into()),
            env_type: EnvironmentType::PreProduction,
            tags: IndexMap::from([("team".to_string(), "cd".to_string())]),
        };
        let over = EnvironmentOverrides {
            env_type: Some(EnvironmentType::Production),
            tags: IndexMap::from([("tier".to_string(), "1".to_string())]),
            ..Default::default()
        };
        let merged = env.apply_overrides(&over);
        assert_eq!(merged.identifier, "qa");
        assert_eq!(merged.name.as_deref(), Some("QA"));
        assert_eq!(merged.env_type, EnvironmentType::Production);
        assert_eq!(merged.tags.len(), 2);
    }
}
