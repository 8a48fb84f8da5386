//! Integration tests for the manifest step creator.

mod helpers;

use helpers::*;
use pipeline_compiler::pipeline::*;
use pipeline_compiler::plan::{Facilitator, ManifestStepParameters, PlanNode, StepParameters, step_type};

fn manifest(identifier: &str, kind: ManifestKind, path: &str) -> ManifestConfig {
    ManifestConfig {
        identifier: identifier.into(),
        kind,
        store: StoreConfig::Git(GitStore {
            connector_ref: "github".into(),
            fetch_type: FetchType::Branch,
            branch: Some("main".into()),
            commit_id: None,
            paths: vec![path.into()],
        }),
    }
}

fn manifest_service(sets: Vec<ManifestOverrideSet>, overrides: StageOverridesConfig) -> ServiceConfig {
    ServiceConfig {
        identifier: Some("svc".into()),
        service_definition: Some(ServiceDefinition {
            deployment_type: "Kubernetes".into(),
            spec: ServiceSpec {
                manifests: vec![
                    manifest("deployment", ManifestKind::K8sManifest, "k8s/deployment.yaml"),
                    manifest("values", ManifestKind::Values, "k8s/values.yaml"),
                ],
                manifest_override_sets: sets,
                ..Default::default()
            },
        }),
        stage_overrides: Some(overrides),
        ..Default::default()
    }
}

fn stage_with(service: ServiceConfig) -> Stage {
    Stage {
        identifier: "deploy".into(),
        name: None,
        spec: StageType::Deployment(DeploymentStage {
            service: Some(service),
            infrastructure: None,
            phases: vec![phase("ph1", vec![http_step("verify")])],
        }),
    }
}

fn params(node: &PlanNode) -> &ManifestStepParameters {
    match &node.step_parameters {
        StepParameters::Manifest(p) => p,
        other => panic!("Expected manifest parameters, got {:?}", other),
    }
}

#[test]
fn undefined_override_set_is_fatal() {
    let svc = manifest_service(
        vec![],
        StageOverridesConfig {
            use_manifest_override_sets: vec!["setA".into()],
            ..Default::default()
        },
    );
    let err = compile_err(&pipeline(vec![stage_with(svc)]));
    assert_eq!(err.code, "C012");
    assert!(err.message.contains("Manifest Override Set is not defined"));
}

#[test]
fn manifest_step_is_sync_with_layers_kept_apart() {
    let sets = vec![ManifestOverrideSet {
        identifier: "setA".into(),
        manifests: vec![manifest("values", ManifestKind::Values, "k8s/values-a.yaml")],
    }];
    let svc = manifest_service(
        sets,
        StageOverridesConfig {
            use_manifest_override_sets: vec!["setA".into()],
            manifests: vec![manifest("extra", ManifestKind::Values, "k8s/extra.yaml")],
            ..Default::default()
        },
    );
    let plan = compile_ok(&pipeline(vec![stage_with(svc)]));

    let step = node(&plan, "manifests");
    assert_eq!(step.step_type, step_type::MANIFEST_STEP);
    assert_eq!(step.facilitator, Facilitator::Sync);

    let p = params(step);
    assert_eq!(p.service_spec_manifests.len(), 2);
    assert_eq!(p.manifest_override_sets.len(), 1);
    assert_eq!(p.stage_override_manifests.len(), 1);

    let resolved: Vec<(&str, &StoreConfig)> =
        p.resolved.iter().map(|m| (m.identifier.as_str(), &m.store)).collect();
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[0].0, "deployment");
    assert_eq!(resolved[1].0, "values");
    assert_eq!(resolved[2].0, "extra");
    let StoreConfig::Git(values_store) = resolved[1].1 else {
        panic!("Expected a git store");
    };
    assert_eq!(values_store.paths, vec!["k8s/values-a.yaml"]);
}

#[test]
fn duplicate_manifest_identifiers_are_rejected() {
    let mut svc = manifest_service(vec![], StageOverridesConfig::default());
    if let Some(def) = svc.service_definition.as_mut() {
        def.spec
            .manifests
            .push(manifest("values", ManifestKind::Values, "k8s/other.yaml"));
    }
    assert_eq!(compile_err(&pipeline(vec![stage_with(svc)])).code, "C023");
}

#[test]
fn duplicate_stage_override_manifests_are_rejected() {
    let svc = manifest_service(
        vec![],
        StageOverridesConfig {
            manifests: vec![
                manifest("values", ManifestKind::Values, "k8s/one.yaml"),
                manifest("values", ManifestKind::Values, "k8s/two.yaml"),
            ],
            ..Default::default()
        },
    );
    let err = compile_err(&pipeline(vec![stage_with(svc)]));
    assert_eq!(err.code, "C023");
    assert_eq!(err.node_id.as_deref(), Some("values"));
}

#[test]
fn duplicate_manifests_inside_an_override_set_are_rejected() {
    let sets = vec![ManifestOverrideSet {
        identifier: "setA".into(),
        manifests: vec![
            manifest("values", ManifestKind::Values, "k8s/values-a.yaml"),
            manifest("values", ManifestKind::Values, "k8s/values-b.yaml"),
        ],
    }];
    let svc = manifest_service(
        sets,
        StageOverridesConfig {
            use_manifest_override_sets: vec!["setA".into()],
            ..Default::default()
        },
    );
    let err = compile_err(&pipeline(vec![stage_with(svc)]));
    assert_eq!(err.code, "C023");
    assert!(err.message.contains("setA"));
}

#[test]
fn same_identifier_across_sources_is_merged() {
    let sets = vec![ManifestOverrideSet {
        identifier: "setA".into(),
        manifests: vec![manifest("values", ManifestKind::Values, "k8s/values-a.yaml")],
    }];
    let svc = manifest_service(
        sets,
        StageOverridesConfig {
            use_manifest_override_sets: vec!["setA".into()],
            manifests: vec![manifest("values", ManifestKind::Values, "k8s/values-stage.yaml")],
            ..Default::default()
        },
    );
    let plan = compile_ok(&pipeline(vec![stage_with(svc)]));
    let p = params(node(&plan, "manifests"));
    assert_eq!(p.resolved.len(), 2);
    let StoreConfig::Git(values_store) = &p.resolved[1].store else {
        panic!("Expected a git store");
    };
    assert_eq!(values_store.paths, vec!["k8s/values-stage.yaml"]);
}

#[test]
fn fixture_prod_stage_uses_the_prod_values() {
    let p = parse(include_str!("fixtures/multi_stage_k8s.json")).unwrap();
    let plan = compile_ok(&p);

    let steps: Vec<&PlanNode> = plan.nodes_of_type(step_type::MANIFEST_STEP).collect();
    assert_eq!(steps.len(), 2);

    let values_path = |node: &PlanNode| -> Vec<String> {
        params(node)
            .resolved
            .iter()
            .find(|m| m.identifier == "values")
            .map(|m| match &m.store {
                StoreConfig::Local(local) => local.paths.clone(),
                StoreConfig::Git(git) => git.paths.clone(),
            })
            .unwrap_or_default()
    };
    assert_eq!(values_path(steps[0]), vec!["k8s/values.yaml"]);
    assert_eq!(values_path(steps[1]), vec!["k8s/values-prod.yaml"]);
}
