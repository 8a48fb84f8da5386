#![allow(dead_code)]

use indexmap::IndexMap;
use pipeline_compiler::plan::*;
use pipeline_compiler::pipeline::*;
use pipeline_compiler::{CompilerError, PlanOptions};

// =============================================================================
// Pipeline builders
// =============================================================================

pub fn http_step(identifier: &str) -> StepElement {
    StepElement {
        identifier: identifier.into(),
        name: None,
        spec: StepInfo::Http(HttpStepInfo {
            url: format!("https://example.com/{}", identifier),
            method: "GET".into(),
            headers: IndexMap::new(),
            request_body: None,
            socket_timeout_millis: None,
        }),
    }
}

pub fn shell_step(identifier: &str) -> StepElement {
    StepElement {
        identifier: identifier.into(),
        name: None,
        spec: StepInfo::ShellScript(ShellScriptStepInfo {
            shell: ShellType::Bash,
            script: "echo done".into(),
            on_delegate: true,
        }),
    }
}

pub fn rolling_step(identifier: &str) -> StepElement {
    StepElement {
        identifier: identifier.into(),
        name: None,
        spec: StepInfo::K8sRollingDeploy(K8sRollingStepInfo {
            skip_dry_run: false,
            timeout: Some("10m".into()),
        }),
    }
}

pub fn phase(identifier: &str, steps: Vec<StepElement>) -> Phase {
    Phase {
        identifier: identifier.into(),
        display_name: None,
        steps: steps.into_iter().map(ExecutionWrapper::Step).collect(),
        rollback_steps: vec![],
    }
}

pub fn deployment(identifier: &str, phases: Vec<Phase>) -> Stage {
    Stage {
        identifier: identifier.into(),
        name: None,
        spec: StageType::Deployment(DeploymentStage {
            service: None,
            infrastructure: None,
            phases,
        }),
    }
}

/// Deployment stage with a service, an infrastructure and one phase.
pub fn full_deployment(
    identifier: &str,
    service: ServiceConfig,
    infrastructure: PipelineInfrastructure,
    steps: Vec<StepElement>,
) -> Stage {
    Stage {
        identifier: identifier.into(),
        name: None,
        spec: StageType::Deployment(DeploymentStage {
            service: Some(service),
            infrastructure: Some(infrastructure),
            phases: vec![phase("deploy", steps)],
        }),
    }
}

pub fn pipeline(stages: Vec<Stage>) -> Pipeline {
    Pipeline {
        identifier: "pipeline".into(),
        name: Some("Test Pipeline".into()),
        stages,
    }
}

pub fn dockerhub(image: &str) -> ArtifactConfig {
    ArtifactConfig::Dockerhub(DockerHubArtifactConfig {
        connector_ref: Some("docker_conn".into()),
        image_path: Some(image.into()),
        tag: Some("1.0".into()),
        tag_regex: None,
    })
}

pub fn service(artifacts: ArtifactListConfig) -> ServiceConfig {
    ServiceConfig {
        identifier: Some("svc".into()),
        name: Some("Service".into()),
        description: None,
        service_definition: Some(ServiceDefinition {
            deployment_type: "Kubernetes".into(),
            spec: ServiceSpec {
                artifacts: Some(artifacts),
                ..Default::default()
            },
        }),
        use_from_stage: None,
        stage_overrides: None,
    }
}

pub fn k8s_infra(namespace: &str) -> PipelineInfrastructure {
    PipelineInfrastructure {
        environment: Some(EnvironmentYaml {
            identifier: "qa".into(),
            name: Some("QA".into()),
            env_type: EnvironmentType::PreProduction,
            tags: IndexMap::new(),
        }),
        infrastructure_definition: Some(InfrastructureDef::KubernetesDirect(K8sDirectInfrastructure {
            connector_ref: Some("cluster_conn".into()),
            namespace: Some(namespace.into()),
            release_name: Some("release".into()),
        })),
        use_from_stage: None,
    }
}

pub fn infra_from(stage: &str) -> PipelineInfrastructure {
    PipelineInfrastructure {
        environment: None,
        infrastructure_definition: None,
        use_from_stage: Some(InfraUseFromStage {
            stage: stage.into(),
            overrides: None,
        }),
    }
}

// =============================================================================
// Compile helpers
// =============================================================================

/// Compile with default options, panicking on any error.
pub fn compile_ok(pipeline: &Pipeline) -> ExecutionPlan {
    match pipeline_compiler::compile(pipeline, &PlanOptions::default()) {
        Ok(plan) => plan,
        Err(errors) => panic!("Unexpected errors: {:?}", errors),
    }
}

/// Compile with default options, expecting exactly one creation error.
pub fn compile_err(pipeline: &Pipeline) -> CompilerError {
    match pipeline_compiler::create_plan(pipeline) {
        Ok(_) => panic!("Expected compilation to fail"),
        Err(e) => e,
    }
}

/// Indented outline of the plan from its starting node, rollback chains
/// included. Node ids are left out so the outline is stable across compiles.
pub fn outline(plan: &ExecutionPlan) -> String {
    let mut lines = Vec::new();
    if let Some(start) = plan.starting_node() {
        outline_lines(plan, start, 0, &mut lines);
    }
    lines.join("\n")
}

fn outline_lines(plan: &ExecutionPlan, node: &PlanNode, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}{} {} [{}]",
        "  ".repeat(depth),
        node.step_type,
        node.identifier,
        node.facilitator
    ));
    for id in node.step_parameters.structural_node_ids() {
        if let Some(child) = plan.node(id) {
            outline_lines(plan, child, depth + 1, lines);
        }
    }
}

/// The single node with the given identifier.
pub fn node<'a>(plan: &'a ExecutionPlan, identifier: &str) -> &'a PlanNode {
    plan.node_by_identifier(identifier)
        .unwrap_or_else(|| panic!("No node with identifier '{}'", identifier))
}
