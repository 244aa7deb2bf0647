use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    rule::{
        db::{get_all_rules, get_rule},
        models::{Rule, RuleId, RuleState},
    },
};

/// A route handler for listing every rule in creation order.
pub async fn get_rules_endpoint(State(state): State<RuleState>) -> Result<Json<Vec<Rule>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rules = get_all_rules(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve rules: {error}"))?;

    Ok(Json(rules))
}

/// A route handler for getting a single rule.
pub async fn get_rule_endpoint(
    Path(rule_id): Path<RuleId>,
    State(state): State<RuleState>,
) -> Result<Json<Rule>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_rule(rule_id, &connection).map(Json)
}

#[cfg(test)]
mod list_rules_endpoint_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use uuid::Uuid;

    use crate::{
        AppState, Rule, RuleRequest, build_router, create_rule, endpoints,
        endpoints::format_endpoint,
    };

    fn get_test_state() -> AppState {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        AppState::new(connection).expect("Could not initialize database.")
    }

    fn request(name: &str) -> RuleRequest {
        RuleRequest {
            name: name.to_owned(),
            is_strict: true,
            triggers: vec![],
            actions: vec![],
            rule_group_name: None,
        }
    }

    #[tokio::test]
    async fn lists_rules_in_creation_order() {
        let state = get_test_state();
        let want: Vec<Rule> = {
            let connection = state.db_connection.lock().unwrap();
            ["Rent", "Coffee"]
                .into_iter()
                .map(|name| create_rule(&request(name), &connection).unwrap())
                .collect()
        };
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server.get(endpoints::RULES).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Rule>>(), want);
    }

    #[tokio::test]
    async fn empty_list() {
        let server =
            TestServer::try_new(build_router(get_test_state())).expect("Could not create test server.");

        let response = server.get(endpoints::RULES).await;

        response.assert_status_ok();
        assert!(response.json::<Vec<Rule>>().is_empty());
    }

    #[tokio::test]
    async fn missing_rule_is_not_found() {
        let server =
            TestServer::try_new(build_router(get_test_state())).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE, Uuid::new_v4()))
            .await;

        response.assert_status_not_found();
    }
}
