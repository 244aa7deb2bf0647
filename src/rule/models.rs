use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState, Error,
    account::account_exists,
    rule::{
        action::{Action, ActionKind},
        field::TransactionField,
        group::rule_group_exists,
        trigger::Trigger,
    },
    transaction::Transaction,
};

/// The identifier of a rule.
pub type RuleId = Uuid;

/// A named set of triggers and the actions to take when they match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The ID of the rule.
    pub id: RuleId,

    /// A name for people to recognise the rule by.
    pub name: String,

    /// `true` if every trigger must match, `false` if any one is enough.
    pub is_strict: bool,

    /// The tests that decide whether the rule fires.
    pub triggers: Vec<Trigger>,

    /// Applied in order to every transaction the rule fires on.
    pub actions: Vec<Action>,

    /// The group this rule is run with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_group_name: Option<String>,
}

impl Rule {
    /// Decide whether the rule fires for `transaction`.
    ///
    /// A strict rule with no triggers fires for every transaction, a non-strict
    /// rule with no triggers never fires.
    pub fn should_trigger_for(&self, transaction: &Transaction) -> bool {
        if self.is_strict {
            self.triggers.iter().all(|trigger| trigger.matches(transaction))
        } else {
            self.triggers.iter().any(|trigger| trigger.matches(transaction))
        }
    }

    /// Apply every action in order to `transaction`.
    ///
    /// Deleting a transaction does not stop the remaining actions.
    ///
    /// # Errors
    /// Returns the first error raised by an action. Actions before it have
    /// already been applied, so callers should discard `transaction`.
    pub fn apply_actions_to(&self, transaction: &mut Transaction) -> Result<(), Error> {
        self.actions
            .iter()
            .try_for_each(|action| action.apply_to(transaction))
    }

    /// The rule's triggers then its actions, as people would read them.
    pub fn summary(&self) -> String {
        self.triggers
            .iter()
            .map(ToString::to_string)
            .chain(self.actions.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The body of a request to create or update a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    /// See [Rule::name].
    pub name: String,
    /// See [Rule::is_strict].
    #[serde(default)]
    pub is_strict: bool,
    /// See [Rule::triggers].
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// See [Rule::actions].
    #[serde(default)]
    pub actions: Vec<Action>,
    /// The name of an existing rule group, or `None` to leave the rule ungrouped.
    #[serde(default)]
    pub rule_group_name: Option<String>,
}

impl RuleRequest {
    /// Check the request before anything is written.
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] if:
    /// - the name is blank,
    /// - a trigger or action breaks its invariants,
    /// - an action moves transactions to an account that does not exist,
    /// - `rule_group_name` does not name an existing rule group.
    ///
    /// Returns [Error::SqlError] if the lookups fail.
    pub fn validate(&self, connection: &Connection) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRequest {
                field: "name".to_owned(),
                message: "Rule name cannot be empty".to_owned(),
            });
        }

        self.triggers.iter().try_for_each(Trigger::validate)?;
        self.actions.iter().try_for_each(Action::validate)?;

        for action in &self.actions {
            let is_account_field = matches!(
                action.field,
                Some(TransactionField::Source | TransactionField::Destination)
            );
            if action.kind != ActionKind::Set || !is_account_field {
                continue;
            }

            // Already validated, so this is a well-formed UUID.
            let Some(account_id) = action.value.as_deref().and_then(|v| v.parse().ok()) else {
                continue;
            };

            if !account_exists(account_id, connection)? {
                return Err(Error::InvalidRequest {
                    field: "actions".to_owned(),
                    message: format!("No account with the ID {account_id} exists"),
                });
            }
        }

        if let Some(name) = &self.rule_group_name
            && !rule_group_exists(name, connection)?
        {
            return Err(Error::InvalidRequest {
                field: "ruleGroupName".to_owned(),
                message: format!("No rule group called {name} exists"),
            });
        }

        Ok(())
    }
}

/// Unified state for all rule-related operations.
#[derive(Debug, Clone)]
pub struct RuleState {
    /// The connection to the application's database.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RuleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
