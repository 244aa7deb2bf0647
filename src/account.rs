//! Accounts are the sources and destinations of transactions.
//!
//! The rule engine only needs to know whether an account exists, so that rules
//! which move a transaction to another account can be rejected up front.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// The identifier of an account.
pub type AccountId = Uuid;

/// A bank account, credit card or other place where money is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The display name of the account.
    pub name: String,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        (),
    )?;

    Ok(())
}

/// Create an account called `name`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error, e.g., the name is
/// already used by another account.
pub fn create_account(name: &str, connection: &Connection) -> Result<Account, Error> {
    let id = Uuid::new_v4();

    connection.execute(
        "INSERT INTO account (id, name) VALUES (?1, ?2)",
        (id.to_string(), name),
    )?;

    Ok(Account {
        id,
        name: name.to_owned(),
    })
}

/// Check whether an account with `id` exists.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn account_exists(id: AccountId, connection: &Connection) -> Result<bool, Error> {
    let found = connection
        .query_row(
            "SELECT 1 FROM account WHERE id = ?1",
            [id.to_string()],
            |_| Ok(()),
        )
        .optional()?;

    Ok(found.is_some())
}
