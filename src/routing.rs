//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState, endpoints,
    logging::logging_middleware,
    rule::{
        create_rule_endpoint, create_rule_group_endpoint, delete_rule_endpoint,
        delete_rule_group_endpoint, get_matching_transactions_endpoint, get_rule_endpoint,
        get_rule_group_endpoint, get_rule_groups_endpoint, get_rules_endpoint,
        rename_rule_group_endpoint, run_all_rules_endpoint, run_rule_endpoint,
        run_rule_group_endpoint, update_rule_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::RULES,
            get(get_rules_endpoint).post(create_rule_endpoint),
        )
        .route(endpoints::RUN_ALL_RULES, post(run_all_rules_endpoint))
        .route(
            endpoints::RULE,
            get(get_rule_endpoint)
                .put(update_rule_endpoint)
                .delete(delete_rule_endpoint),
        )
        .route(
            endpoints::RULE_MATCHING,
            get(get_matching_transactions_endpoint),
        )
        .route(endpoints::RUN_RULE, post(run_rule_endpoint))
        .route(
            endpoints::RULE_GROUPS,
            get(get_rule_groups_endpoint).post(create_rule_group_endpoint),
        )
        .route(
            endpoints::RULE_GROUP,
            get(get_rule_group_endpoint)
                .put(rename_rule_group_endpoint)
                .delete(delete_rule_group_endpoint),
        )
        .route(endpoints::RUN_RULE_GROUP, post(run_rule_group_endpoint))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
