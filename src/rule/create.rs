use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    endpoints::{self, format_endpoint},
    rule::{
        db::create_rule,
        models::{RuleRequest, RuleState},
    },
};

/// A route handler for creating a new rule.
///
/// Responds with `201 Created` and the new rule.
pub async fn create_rule_endpoint(
    State(state): State<RuleState>,
    Json(request): Json<RuleRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rule = create_rule(&request, &connection)?;

    tracing::info!("Created rule \"{}\" ({})", rule.name, rule.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::RULE, rule.id))],
        Json(rule),
    )
        .into_response())
}
