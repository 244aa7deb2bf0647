//! Route handlers for previewing and running rules.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    rule::{
        db::{get_all_rules, get_rule},
        models::{RuleId, RuleState},
        runner::{DateRange, RunRuleRequest, find_matching_transactions, run_rule, run_rules},
    },
    transaction::Transaction,
};

const DEFAULT_MATCH_LIMIT: usize = 5;

/// The query string of a match preview.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingParams {
    /// The first day to search, `yyyy-MM-dd`.
    pub start: String,
    /// The last day to search, `yyyy-MM-dd`.
    pub end: String,
    /// The most transactions to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// The response to a run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    /// The number of times a rule fired on a transaction.
    pub count: usize,
}

/// A route handler for previewing the transactions a rule would change.
pub async fn get_matching_transactions_endpoint(
    Path(rule_id): Path<RuleId>,
    State(state): State<RuleState>,
    Query(params): Query<MatchingParams>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let range = DateRange::parse_fields(("start", &params.start), ("end", &params.end))?;
    let limit = params.limit.unwrap_or(DEFAULT_MATCH_LIMIT);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rule = get_rule(rule_id, &connection)?;

    find_matching_transactions(&rule, &range, limit, &connection).map(Json)
}

/// A route handler for running a single rule.
pub async fn run_rule_endpoint(
    Path(rule_id): Path<RuleId>,
    State(state): State<RuleState>,
    Json(request): Json<RunRuleRequest>,
) -> Result<Json<RunResponse>, Error> {
    let range = request.date_range()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rule = get_rule(rule_id, &connection)?;
    let count = run_rule(&rule, &range, &connection)?;

    Ok(Json(RunResponse { count }))
}

/// A route handler for running every rule in creation order.
pub async fn run_all_rules_endpoint(
    State(state): State<RuleState>,
    Json(request): Json<RunRuleRequest>,
) -> Result<Json<RunResponse>, Error> {
    let range = request.date_range()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rules = get_all_rules(&connection)?;
    let count = run_rules(&rules, &range, &connection)?;

    Ok(Json(RunResponse { count }))
}
