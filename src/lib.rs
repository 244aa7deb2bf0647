//! Ledger Rules is the automation engine of a personal finance ledger.
//!
//! Rules are made of triggers, predicates over transaction fields, and
//! actions, ordered mutations such as appending to a description or setting a
//! category. Rules are run against the transactions that fall within a date
//! range and the mutated transactions are written back to the SQLite store in
//! a single batch.
//!
//! This library also provides a JSON API for managing and running rules.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod db;
mod endpoints;
mod logging;
mod routing;
mod rule;
mod transaction;

pub use account::{Account, AccountId, create_account};
pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use rule::{
    Action, ActionKind, Condition, DateRange, MatchingQuery, Rule, RuleGroup, RuleId, RuleRequest,
    TransactionField, Trigger, build_query, create_rule, create_rule_group,
    find_matching_transactions, run_rule, run_rule_group, run_rules,
};
pub use transaction::{
    Transaction, TransactionBuilder, TransactionId, TransactionType, create_transaction,
    get_transaction,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
        },
    }

    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent a request that failed validation.
    ///
    /// `field` names the offending request field so that clients can point
    /// the user at it.
    #[error("invalid value for \"{field}\": {message}")]
    InvalidRequest {
        /// The name of the request field that was rejected.
        field: String,
        /// Why the field was rejected.
        message: String,
    },

    /// A date string in a request could not be parsed.
    #[error("could not parse the date \"{value}\": {reason}")]
    InvalidDateFormat {
        /// The name of the request field holding the date.
        field: String,
        /// The text that failed to parse.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A value could not be converted to the type of the transaction field it
    /// was being written to.
    #[error("could not parse \"{value}\" as a value for {field}: {reason}")]
    ParseError {
        /// The name of the transaction field.
        field: String,
        /// The text that failed to parse.
        value: String,
        /// The underlying parse error.
        reason: String,
    },

    /// An operation that can never succeed was attempted, e.g., clearing a
    /// required transaction field.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Applying a rule's actions to a transaction failed.
    ///
    /// The whole run that this rule was part of is rolled back.
    #[error("rule {rule_id} failed on transaction {transaction_id}: {source}")]
    RuleApplicationFailed {
        /// The rule that was being applied.
        rule_id: uuid::Uuid,
        /// The transaction the rule was applied to.
        transaction_id: uuid::Uuid,
        /// What went wrong.
        source: Box<Error>,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a rule that does not exist
    #[error("tried to update a rule that is not in the database")]
    UpdateMissingRule,

    /// Tried to delete a rule that does not exist
    #[error("tried to delete a rule that is not in the database")]
    DeleteMissingRule,

    /// Tried to rename a rule group that does not exist
    #[error("tried to update a rule group that is not in the database")]
    UpdateMissingRuleGroup,

    /// Tried to delete a rule group that does not exist
    #[error("tried to delete a rule group that is not in the database")]
    DeleteMissingRuleGroup,

    /// The rule group name is already taken.
    #[error("the rule group \"{0}\" already exists in the database")]
    DuplicateRuleGroupName(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::InvalidRequest { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "field": field, "message": message }),
            ),
            Error::InvalidDateFormat { ref field, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "field": field, "message": self.to_string() }),
            ),
            Error::ParseError { ref field, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "field": field, "message": self.to_string() }),
            ),
            Error::InvalidOperation(_) | Error::DuplicateRuleGroupName(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": self.to_string() }),
            ),
            Error::RuleApplicationFailed {
                rule_id,
                transaction_id,
                ref source,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "ruleId": rule_id,
                    "transactionId": transaction_id,
                    "message": source.to_string(),
                }),
            ),
            Error::NotFound
            | Error::UpdateMissingRule
            | Error::DeleteMissingRule
            | Error::UpdateMissingRuleGroup
            | Error::DeleteMissingRuleGroup => (
                StatusCode::NOT_FOUND,
                json!({ "message": self.to_string() }),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "message": "An unexpected error occurred, check the server logs for more details."
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
