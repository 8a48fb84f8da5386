//! `useFromStage` resolution.
//!
//! A stage may adopt the service or infrastructure of another stage in the
//! same pipeline instead of declaring its own. The referenced stage's config is
//! copied, then the overrides declared on the referencing stage are applied
//! field by field. A stage that uses `useFromStage` must not also declare the
//! config locally, and the referenced stage must declare it itself.

use crate::error::CompilerError;
use crate::pipeline::types::*;

use super::context::PlanCreationContext;

/// Resolve a stage's infrastructure to concrete environment + definition.
pub fn resolve_infrastructure(
    infrastructure: &PipelineInfrastructure,
    ctx: &PlanCreationContext<'_>,
) -> Result<PipelineInfrastructure, CompilerError> {
    let Some(use_from_stage) = &infrastructure.use_from_stage else {
        return Ok(infrastructure.clone());
    };
    let source = use_from_stage.stage.trim();
    ensure_stage_given(source)?;

    if infrastructure.infrastructure_definition.is_some() {
        return Err(exclusive_with_use_from_stage("Infrastructure definition", source));
    }
    if infrastructure.environment.is_some() {
        return Err(exclusive_with_use_from_stage("Environment", source));
    }

    let referenced = propagated_from(ctx, source)?
        .infrastructure
        .as_ref()
        .ok_or_else(|| missing_in_stage("infrastructure", source))?;
    if referenced.use_from_stage.is_some() {
        return Err(chained_use_from_stage(source));
    }

    let overrides = use_from_stage.overrides.clone().unwrap_or_default();

    let environment = match (&referenced.environment, &overrides.environment) {
        (Some(env), Some(over)) => Some(env.apply_overrides(over)),
        (env, _) => env.clone(),
    };

    let infrastructure_definition = match (
        &referenced.infrastructure_definition,
        &overrides.infrastructure_definition,
    ) {
        (Some(base), Some(over)) => Some(base.apply_override(over).ok_or_else(|| {
            CompilerError::invalid(
                "C018",
                format!(
                    "Infrastructure override of type {} does not match {} from stage [{}]",
                    over.infra_type(),
                    base.infra_type(),
                    source
                ),
                Some(source.to_string()),
            )
        })?),
        (None, Some(over)) => Some(over.clone()),
        (base, None) => base.clone(),
    };

    Ok(PipelineInfrastructure {
        environment,
        infrastructure_definition,
        use_from_stage: None,
    })
}

/// Resolve a stage's service config, adopting the referenced stage's service
/// when `useFromStage` is set. Stage overrides always stay with the
/// referencing stage.
pub fn resolve_service(
    service: &ServiceConfig,
    ctx: &PlanCreationContext<'_>,
) -> Result<ServiceConfig, CompilerError> {
    let Some(use_from_stage) = &service.use_from_stage else {
        return Ok(service.clone());
    };
    let source = use_from_stage.stage.trim();
    ensure_stage_given(source)?;

    if service.service_definition.is_some() {
        return Err(exclusive_with_use_from_stage("Service definition", source));
    }

    let referenced = propagated_from(ctx, source)?
        .service
        .as_ref()
        .ok_or_else(|| missing_in_stage("service", source))?;
    if referenced.use_from_stage.is_some() {
        return Err(chained_use_from_stage(source));
    }

    let overrides = use_from_stage.overrides.clone().unwrap_or_default();

    Ok(ServiceConfig {
        identifier: referenced.identifier.clone(),
        name: overrides.name.or_else(|| referenced.name.clone()),
        description: overrides.description.or_else(|| referenced.description.clone()),
        service_definition: referenced.service_definition.clone(),
        use_from_stage: None,
        stage_overrides: service.stage_overrides.clone(),
    })
}

fn ensure_stage_given(source: &str) -> Result<(), CompilerError> {
    if source.is_empty() {
        return Err(CompilerError::invalid(
            "C016",
            "Stage identifier is empty in useFromStage",
            None,
        ));
    }
    Ok(())
}

fn propagated_from<'a>(
    ctx: &PlanCreationContext<'a>,
    source: &str,
) -> Result<&'a DeploymentStage, CompilerError> {
    let stage = ctx.pipeline()?.stage(source).ok_or_else(|| {
        CompilerError::unresolvable(
            "C020",
            format!("Stage identifier given in useFromStage doesn't exist: [{}]", source),
            Some(source.to_string()),
        )
    })?;
    stage.as_deployment().ok_or_else(|| {
        CompilerError::invalid(
            "C021",
            format!(
                "Stage [{}] given in useFromStage is a {} stage, not a deployment stage",
                source,
                stage.spec.type_name()
            ),
            Some(source.to_string()),
        )
    })
}

fn exclusive_with_use_from_stage(what: &str, source: &str) -> CompilerError {
    CompilerError::invalid(
        "C014",
        format!("{} should not exist with UseFromStage [{}]", what, source),
        Some(source.to_string()),
    )
}

fn chained_use_from_stage(source: &str) -> CompilerError {
    CompilerError::invalid(
        "C015",
        format!(
            "Invalid identifier [{}] given in useFromStage. Cannot reference a stage which also has useFromStage parameter",
            source
        ),
        Some(source.to_string()),
    )
}

fn missing_in_stage(what: &str, source: &str) -> CompilerError {
    CompilerError::invalid(
        "C021",
        format!(
            "Could not find {} configuration in stage [{}], hence not possible to propagate it",
            what, source
        ),
        Some(source.to_string()),
    )
}
