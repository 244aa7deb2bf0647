//! Rules automate changes to transactions.
//!
//! A rule is a list of triggers, tests against transaction fields, and a list
//! of actions, edits to those fields. A strict rule fires when every trigger
//! matches, otherwise any single trigger is enough.
//!
//! This module contains:
//! - The field, trigger and action types and the logic for evaluating them
//! - A query builder that narrows the transactions a rule has to look at
//! - The runner that applies rules to a date range and saves the results
//! - Database functions for rules and rule groups
//! - Route handlers for the rule JSON API

mod action;
mod create;
mod db;
mod delete;
mod edit;
mod field;
mod group;
mod group_endpoints;
mod list;
mod models;
mod query;
mod run;
mod runner;
mod trigger;

pub use action::{Action, ActionKind};
pub use create::create_rule_endpoint;
pub use db::{create_rule, create_rule_table};
pub use delete::delete_rule_endpoint;
pub use edit::update_rule_endpoint;
pub use field::TransactionField;
pub use group::{RuleGroup, create_rule_group, create_rule_group_table};
pub use group_endpoints::{
    create_rule_group_endpoint, delete_rule_group_endpoint, get_rule_group_endpoint,
    get_rule_groups_endpoint, rename_rule_group_endpoint, run_rule_group_endpoint,
};
pub use list::{get_rule_endpoint, get_rules_endpoint};
pub use models::{Rule, RuleId, RuleRequest};
pub use query::{MatchingQuery, build_query};
pub use run::{get_matching_transactions_endpoint, run_all_rules_endpoint, run_rule_endpoint};
pub use runner::{DateRange, find_matching_transactions, run_rule, run_rule_group, run_rules};
pub use trigger::{Condition, Trigger};
