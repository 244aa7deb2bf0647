//! Route handlers for rule groups.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    rule::{
        group::{
            RuleGroup, RuleGroupRequest, create_rule_group, delete_rule_group, get_rule_group,
            list_rule_groups, rename_rule_group,
        },
        models::{Rule, RuleState},
        run::RunResponse,
        runner::{RunRuleRequest, run_rule_group},
    },
};

/// A route handler for listing every rule group with its rules.
pub async fn get_rule_groups_endpoint(
    State(state): State<RuleState>,
) -> Result<Json<BTreeMap<String, Vec<Rule>>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    list_rule_groups(&connection).map(Json)
}

/// A route handler for getting a single rule group.
pub async fn get_rule_group_endpoint(
    Path(name): Path<String>,
    State(state): State<RuleState>,
) -> Result<Json<RuleGroup>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_rule_group(&name, &connection).map(Json)
}

/// A route handler for creating a rule group.
pub async fn create_rule_group_endpoint(
    State(state): State<RuleState>,
    Json(request): Json<RuleGroupRequest>,
) -> Result<(StatusCode, Json<RuleGroup>), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let group = create_rule_group(&request.name, &connection)?;

    tracing::info!("Created rule group \"{}\"", group.name);

    Ok((StatusCode::CREATED, Json(group)))
}

/// A route handler for renaming a rule group.
pub async fn rename_rule_group_endpoint(
    Path(name): Path<String>,
    State(state): State<RuleState>,
    Json(request): Json<RuleGroupRequest>,
) -> Result<Json<RuleGroup>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let group = rename_rule_group(&name, &request.name, &connection)?;

    tracing::info!("Renamed rule group \"{name}\" to \"{}\"", group.name);

    Ok(Json(group))
}

/// A route handler for deleting a rule group. The group's rules are kept.
pub async fn delete_rule_group_endpoint(
    Path(name): Path<String>,
    State(state): State<RuleState>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_rule_group(&name, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for running the rules in a group.
pub async fn run_rule_group_endpoint(
    Path(name): Path<String>,
    State(state): State<RuleState>,
    Json(request): Json<RunRuleRequest>,
) -> Result<Json<RunResponse>, Error> {
    let range = request.date_range()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let count = run_rule_group(&name, &range, &connection)?;

    Ok(Json(RunResponse { count }))
}
