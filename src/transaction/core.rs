//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::{Error, account::AccountId};

/// The identifier of a transaction.
pub type TransactionId = Uuid;

/// The columns selected by every transaction query, in the order expected by
/// [map_transaction_row].
pub const TRANSACTION_COLUMNS: &str = "id, description, date, amount, type, category, \
     source_account_id, destination_account_id, is_deleted";

// ============================================================================
// MODELS
// ============================================================================

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Whether money was earned, spent or moved between accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money that was spent.
    Expense,
    /// Money that was earned.
    Income,
    /// Money that moved between two of the user's accounts.
    Transfer,
}

impl TransactionType {
    /// The name of the variant, e.g. "Expense".
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "Expense",
            TransactionType::Income => "Income",
            TransactionType::Transfer => "Transfer",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The text did not name a [TransactionType].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not a transaction type, expected one of Expense, Income or Transfer")]
pub struct InvalidTransactionType(String);

impl FromStr for TransactionType {
    type Err = InvalidTransactionType;

    /// Parse the exact (case-sensitive) variant name.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "Expense" => Ok(TransactionType::Expense),
            "Income" => Ok(TransactionType::Income),
            "Transfer" => Ok(TransactionType::Transfer),
            other => Err(InvalidTransactionType(other.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense, income or transfer, i.e. an event where money was spent, earned
/// or moved.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the transaction happened.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// The amount of money spent or earned in this transaction.
    pub amount: Decimal,
    /// Whether this is an expense, income or transfer.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The free-text category of the transaction, e.g. "Groceries".
    pub category: Option<String>,
    /// The account the money came from.
    pub source_account_id: Option<AccountId>,
    /// The account the money went to.
    pub destination_account_id: Option<AccountId>,
    /// Soft delete flag. Deleted transactions stay in the database.
    pub is_deleted: bool,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: Decimal, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            description: Some(description.to_owned()),
            transaction_type: TransactionType::Expense,
            category: None,
            source_account_id: None,
            destination_account_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Optional fields default to `None` and the type defaults to
/// [TransactionType::Expense]. Pass the builder to [create_transaction] to
/// store it, or call [TransactionBuilder::finalise] for an in-memory copy.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal::Decimal;
/// use time::macros::date;
///
/// let transaction = Transaction::build(Decimal::new(-4599, 2), date!(2025 - 01 - 15), "COFFEE SHOP")
///     .category(Some("Dining"))
///     .finalise();
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    pub amount: Decimal,

    /// The date when the transaction occurred.
    pub date: Date,

    /// A human-readable description of the transaction, usually the text
    /// that the bank attached to it.
    pub description: Option<String>,

    /// Whether this is an expense, income or transfer.
    pub transaction_type: TransactionType,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category: Option<String>,

    /// The account the money came from.
    pub source_account_id: Option<AccountId>,

    /// The account the money went to.
    pub destination_account_id: Option<AccountId>,
}

impl TransactionBuilder {
    /// Set or clear the description.
    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_owned);
        self
    }

    /// Set the transaction type.
    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Set the category.
    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_owned);
        self
    }

    /// Set the source account.
    pub fn source_account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.source_account_id = account_id;
        self
    }

    /// Set the destination account.
    pub fn destination_account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.destination_account_id = account_id;
        self
    }

    /// Create the transaction with a fresh ID without storing it.
    pub fn finalise(self) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            description: self.description,
            date: self.date,
            amount: self.amount,
            transaction_type: self.transaction_type,
            category: self.category,
            source_account_id: self.source_account_id,
            destination_account_id: self.destination_account_id,
            is_deleted: false,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRequest] if the source or destination account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = builder.finalise();

    connection
        .execute(
            "INSERT INTO \"transaction\" (id, description, date, amount, type, category, \
             source_account_id, destination_account_id, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            (
                transaction.id.to_string(),
                &transaction.description,
                transaction.date,
                transaction.amount.to_string(),
                transaction.transaction_type,
                &transaction.category,
                transaction.source_account_id.map(|id| id.to_string()),
                transaction.destination_account_id.map(|id| id.to_string()),
                transaction.is_deleted,
            ),
        )
        .map_err(map_account_constraint_error)?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id.to_string())], map_transaction_row)?;

    Ok(transaction)
}

/// Write every field of each transaction in `transactions` back to the database.
///
/// **Note**: If you want transactional integrity (all or nothing), pass in a
/// transaction for `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if one of the transactions is not in the database,
/// - [Error::InvalidRequest] if a source or destination account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transactions(
    transactions: &[Transaction],
    connection: &Connection,
) -> Result<(), Error> {
    if transactions.is_empty() {
        return Ok(());
    }

    let mut stmt = connection.prepare(
        "UPDATE \"transaction\" SET description = ?2, date = ?3, amount = ?4, type = ?5, \
         category = ?6, source_account_id = ?7, destination_account_id = ?8, is_deleted = ?9
         WHERE id = ?1",
    )?;

    for transaction in transactions {
        let rows_affected = stmt
            .execute((
                transaction.id.to_string(),
                &transaction.description,
                transaction.date,
                transaction.amount.to_string(),
                transaction.transaction_type,
                &transaction.category,
                transaction.source_account_id.map(|id| id.to_string()),
                transaction.destination_account_id.map(|id| id.to_string()),
                transaction.is_deleted,
            ))
            .map_err(map_account_constraint_error)?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// Every column a rule can look at is stored as TEXT holding the same string
/// that rules see, so that comparisons made by SQLite agree with comparisons
/// made in Rust.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id TEXT PRIMARY KEY,
                description TEXT,
                date TEXT NOT NULL,
                amount TEXT NOT NULL,
                type TEXT NOT NULL,
                category TEXT,
                source_account_id TEXT,
                destination_account_id TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(source_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(destination_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Rule runs always filter by date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date, is_deleted);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// The row must contain the columns in [TRANSACTION_COLUMNS], in that order.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = parse_column(row, 0)?;
    let description = row.get(1)?;
    let date = row.get(2)?;
    let amount = parse_column(row, 3)?;
    let transaction_type = row.get(4)?;
    let category = row.get(5)?;
    let source_account_id = parse_optional_column(row, 6)?;
    let destination_account_id = parse_optional_column(row, 7)?;
    let is_deleted = row.get(8)?;

    Ok(Transaction {
        id,
        description,
        date,
        amount,
        transaction_type,
        category,
        source_account_id,
        destination_account_id,
        is_deleted,
    })
}

/// Parse a TEXT column with the type's [FromStr] implementation.
pub(crate) fn parse_column<T>(row: &Row, index: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(index)?;

    text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

fn parse_optional_column<T>(row: &Row, index: usize) -> Result<Option<T>, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match row.get_ref(index)? {
        ValueRef::Null => Ok(None),
        _ => parse_column(row, index).map(Some),
    }
}

fn map_account_constraint_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidRequest {
            field: "account".to_owned(),
            message: "the source or destination account does not exist".to_owned(),
        },
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
