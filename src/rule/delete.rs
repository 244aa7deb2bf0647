use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    rule::{
        db::delete_rule,
        models::{RuleId, RuleState},
    },
};

/// A route handler for deleting a rule.
///
/// The rule is flagged as deleted and stops appearing in listings and runs.
pub async fn delete_rule_endpoint(
    Path(rule_id): Path<RuleId>,
    State(state): State<RuleState>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_rule(rule_id, &connection).inspect_err(|error| {
        if *error != Error::DeleteMissingRule {
            tracing::error!("An unexpected error occurred while deleting rule {rule_id}: {error}");
        }
    })?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod delete_rule_endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, RuleRequest, build_router, create_rule, endpoints, endpoints::format_endpoint,
    };

    #[tokio::test]
    async fn deletes_rule_once() {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");
        let rule = create_rule(
            &RuleRequest {
                name: "Coffee".to_owned(),
                is_strict: true,
                triggers: vec![],
                actions: vec![],
                rule_group_name: None,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");
        let rule_endpoint = format_endpoint(endpoints::RULE, rule.id);

        server
            .delete(&rule_endpoint)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server.get(&rule_endpoint).await.assert_status_not_found();
        server.delete(&rule_endpoint).await.assert_status_not_found();
    }
}
