use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    rule::{
        db::update_rule,
        models::{Rule, RuleId, RuleRequest, RuleState},
    },
};

/// A route handler for replacing a rule.
pub async fn update_rule_endpoint(
    Path(rule_id): Path<RuleId>,
    State(state): State<RuleState>,
    Json(request): Json<RuleRequest>,
) -> Result<Json<Rule>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rule = update_rule(rule_id, &request, &connection)?;

    tracing::info!("Updated rule \"{}\" ({rule_id})", rule.name);

    Ok(Json(rule))
}
