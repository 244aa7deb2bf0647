//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/rules/{rule_id}', use [format_endpoint].

use std::fmt::Display;

/// The route to list and create rules.
pub const RULES: &str = "/api/rules";
/// The route to get, update and delete a single rule.
pub const RULE: &str = "/api/rules/{rule_id}";
/// The route to preview the transactions a rule would change.
pub const RULE_MATCHING: &str = "/api/rules/{rule_id}/matching";
/// The route to run a single rule.
pub const RUN_RULE: &str = "/api/rules/{rule_id}/run";
/// The route to run every rule.
pub const RUN_ALL_RULES: &str = "/api/rules/run-all";
/// The route to list and create rule groups.
pub const RULE_GROUPS: &str = "/api/rule-groups";
/// The route to get, rename and delete a single rule group.
pub const RULE_GROUP: &str = "/api/rule-groups/{name}";
/// The route to run the rules in a group.
pub const RUN_RULE_GROUP: &str = "/api/rule-groups/{name}/run";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/rules/{rule_id}', '{rule_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |end| param_start + end + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
