//! Integration tests for stage/phase chaining, rollback and parallel blocks.

mod helpers;

use helpers::*;
use pipeline_compiler::PlanOptions;
use pipeline_compiler::pipeline::*;
use pipeline_compiler::plan::*;

#[test]
fn several_stages_are_chained_in_order() {
    let plan = compile_ok(&pipeline(vec![
        deployment("build", vec![phase("ph1", vec![shell_step("compile")])]),
        deployment("test", vec![phase("ph1", vec![shell_step("unit")])]),
        deployment("ship", vec![phase("ph1", vec![http_step("publish")])]),
    ]));

    let stages = node(&plan, "stages");
    assert_eq!(stages.facilitator, Facilitator::ChildChain);
    let order: Vec<&str> = plan
        .children_of(stages)
        .into_iter()
        .map(|n| n.identifier.as_str())
        .collect();
    assert_eq!(order, vec!["build", "test", "ship"]);
}

#[test]
fn legacy_options_compile_only_the_first_stage_and_phase() {
    let p = pipeline(vec![
        deployment(
            "build",
            vec![
                phase("ph1", vec![shell_step("compile")]),
                phase("ph2", vec![shell_step("package")]),
            ],
        ),
        deployment("ship", vec![phase("ph1", vec![http_step("publish")])]),
    ]);
    let plan = pipeline_compiler::compile(&p, &PlanOptions::legacy()).unwrap();

    assert_eq!(plan.nodes.len(), 6);
    assert!(plan.node_by_identifier("ship").is_none());
    assert!(plan.node_by_identifier("ph2").is_none());
    assert_eq!(node(&plan, "stages").facilitator, Facilitator::Child);
    assert_eq!(node(&plan, "execution").facilitator, Facilitator::Child);
}

#[test]
fn several_phases_are_chained_in_order() {
    let plan = compile_ok(&pipeline(vec![deployment(
        "build",
        vec![
            phase("compile", vec![shell_step("a")]),
            phase("package", vec![shell_step("b")]),
        ],
    )]));

    let execution = node(&plan, "execution");
    assert_eq!(execution.facilitator, Facilitator::ChildChain);
    let order: Vec<&str> = plan
        .children_of(execution)
        .into_iter()
        .map(|n| n.identifier.as_str())
        .collect();
    assert_eq!(order, vec!["compile", "package"]);
}

#[test]
fn rollback_is_referenced_but_not_chained() {
    let mut ph = phase("ph1", vec![http_step("deploy")]);
    ph.rollback_steps = vec![
        ExecutionWrapper::Step(shell_step("undo")),
        ExecutionWrapper::Step(http_step("alert")),
    ];
    let plan = compile_ok(&pipeline(vec![deployment("s1", vec![ph])]));

    let phase_node = node(&plan, "ph1");
    let StepParameters::Phase(params) = &phase_node.step_parameters else {
        panic!("Expected phase parameters");
    };
    let rollback_id = params.rollback_node_id.as_deref().expect("rollback chain");
    assert!(!params.child_node_ids.iter().any(|id| id == rollback_id));

    let rollback = plan.node(rollback_id).unwrap();
    assert_eq!(rollback.facilitator, Facilitator::ChildChain);
    let order: Vec<&str> = plan
        .children_of(rollback)
        .into_iter()
        .map(|n| n.identifier.as_str())
        .collect();
    assert_eq!(order, vec!["undo", "alert"]);
    assert!(validate_plan(&plan).is_empty());
}

#[test]
fn rollback_step_may_reuse_a_step_identifier() {
    let mut ph = phase("ph1", vec![shell_step("restart")]);
    ph.rollback_steps = vec![ExecutionWrapper::Step(shell_step("restart"))];
    let plan = compile_ok(&pipeline(vec![deployment("s1", vec![ph])]));
    assert_eq!(plan.nodes_of_type(step_type::SHELL_SCRIPT).count(), 2);
}

#[test]
fn parallel_block_forks_its_steps() {
    let mut ph = phase("ph1", vec![http_step("before")]);
    ph.steps.push(ExecutionWrapper::Parallel(vec![http_step("left"), shell_step("right")]));
    ph.steps.push(ExecutionWrapper::Step(http_step("after")));
    let plan = compile_ok(&pipeline(vec![deployment("s1", vec![ph])]));

    let fork = node(&plan, "parallel.left");
    assert_eq!(fork.step_type, step_type::FORK);
    assert_eq!(fork.facilitator, Facilitator::Children);
    assert_eq!(plan.children_of(fork).len(), 2);

    let chain: Vec<&str> = plan
        .children_of(node(&plan, "ph1"))
        .into_iter()
        .map(|n| n.identifier.as_str())
        .collect();
    assert_eq!(chain, vec!["before", "parallel.left", "after"]);
}

#[test]
fn empty_parallel_block_is_rejected() {
    let mut ph = phase("ph1", vec![http_step("before")]);
    ph.steps.push(ExecutionWrapper::Parallel(vec![]));
    let err = compile_err(&pipeline(vec![deployment("s1", vec![ph])]));
    assert_eq!(err.code, "C019");
    assert_eq!(err.node_id.as_deref(), Some("ph1"));
}

#[test]
fn duplicate_identifier_inside_parallel_block_is_rejected() {
    let mut ph = phase("ph1", vec![http_step("check")]);
    ph.steps.push(ExecutionWrapper::Parallel(vec![shell_step("check")]));
    assert_eq!(compile_err(&pipeline(vec![deployment("s1", vec![ph])])).code, "C017");
}

#[test]
fn stage_sections_are_chained_service_infrastructure_execution() {
    let svc = service(ArtifactListConfig {
        primary: Some(dockerhub("acme/app")),
        sidecars: vec![],
    });
    let plan = compile_ok(&pipeline(vec![full_deployment(
        "dev",
        svc,
        k8s_infra("dev"),
        vec![rolling_step("rolling")],
    )]));

    let stage = node(&plan, "dev");
    let StepParameters::DeploymentStage(params) = &stage.step_parameters else {
        panic!("Expected stage parameters");
    };
    let fields: Vec<&str> = params.field_to_execution_node_id.keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["service", "infrastructure", "execution"]);

    let sections = plan.node(&params.child_node_id).unwrap();
    assert_eq!(sections.identifier, "sections");
    let ids: Vec<&str> = sections.step_parameters.child_node_ids();
    let expected: Vec<&str> = params.field_to_execution_node_id.values().map(String::as_str).collect();
    assert_eq!(ids, expected);
}

#[test]
fn multi_stage_fixture_outline() {
    let p = parse(include_str!("fixtures/multi_stage_k8s.json")).unwrap();
    let plan = compile_ok(&p);

    insta::assert_snapshot!(outline(&plan), @r"
    PIPELINE_SETUP release [CHILD]
      STAGES_STEP stages [CHILD_CHAIN]
        DEPLOYMENT_STAGE_STEP dev [CHILD]
          SECTION_CHAIN sections [CHILD_CHAIN]
            SERVICE checkout [CHILDREN]
              FORK artifacts [CHILDREN]
                ARTIFACT_STEP Dockerhub [TASK]
                ARTIFACT_STEP Dockerhub.envoy [TASK]
              MANIFEST_STEP manifests [SYNC]
            INFRASTRUCTURE_SECTION infrastructureSection [CHILD_CHAIN]
              ENVIRONMENT environment [SYNC]
              INFRASTRUCTURE infrastructure [SYNC]
            EXECUTION_PHASES_STEP execution [CHILD]
              PHASE rollout [CHILD_CHAIN]
                K8sRollingDeploy rolling [TASK]
                FORK parallel.smoke [CHILDREN]
                  Http smoke [TASK]
                  ShellScript notify [TASK]
                SECTION_CHAIN rollback [CHILD_CHAIN]
                  ShellScript undo [TASK]
        DEPLOYMENT_STAGE_STEP prod [CHILD]
          SECTION_CHAIN sections [CHILD_CHAIN]
            SERVICE checkout [CHILDREN]
              FORK artifacts [CHILDREN]
                ARTIFACT_STEP Dockerhub [TASK]
                ARTIFACT_STEP Dockerhub.envoy [TASK]
              MANIFEST_STEP manifests [SYNC]
            INFRASTRUCTURE_SECTION infrastructureSection [CHILD_CHAIN]
              ENVIRONMENT environment [SYNC]
              INFRASTRUCTURE infrastructure [SYNC]
            EXECUTION_PHASES_STEP execution [CHILD]
              PHASE rollout [CHILD_CHAIN]
                K8sRollingDeploy rolling [TASK]
    ");
    assert_eq!(plan.nodes.len(), 33);
}
