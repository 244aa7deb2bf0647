//! Reading and writing transaction fields as text.
//!
//! Rules address transaction fields indirectly through [TransactionField]. Every
//! field has one canonical string form and all rule comparisons operate on it:
//!
//! | Field | Text form |
//! |---|---|
//! | Description, Category | the raw string, may be absent |
//! | Date | `yyyy-MM-dd` |
//! | Amount | the decimal with its scale, e.g. `-12.50` |
//! | Type | `Expense`, `Income` or `Transfer` |
//! | Source, Destination | the hyphenated account UUID, may be absent |

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use uuid::Uuid;

use crate::{
    Error,
    account::AccountId,
    transaction::{Transaction, TransactionType},
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A transaction attribute that triggers can test and actions can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionField {
    /// The bank's description of the transaction.
    Description,
    /// The day the transaction happened.
    Date,
    /// The amount of money.
    Amount,
    /// Expense, income or transfer.
    Type,
    /// The free-text category.
    Category,
    /// The account the money came from.
    Source,
    /// The account the money went to.
    Destination,
}

/// A field value parsed from text, ready to be assigned.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(Option<String>),
    Date(Date),
    Amount(Decimal),
    Type(TransactionType),
    Account(Option<AccountId>),
}

impl TransactionField {
    /// Every field, in declaration order.
    pub const ALL: [TransactionField; 7] = [
        TransactionField::Description,
        TransactionField::Date,
        TransactionField::Amount,
        TransactionField::Type,
        TransactionField::Category,
        TransactionField::Source,
        TransactionField::Destination,
    ];

    /// The name of the field, e.g. "Description".
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionField::Description => "Description",
            TransactionField::Date => "Date",
            TransactionField::Amount => "Amount",
            TransactionField::Type => "Type",
            TransactionField::Category => "Category",
            TransactionField::Source => "Source",
            TransactionField::Destination => "Destination",
        }
    }

    /// The column of the transaction table that stores this field.
    pub fn column_name(self) -> &'static str {
        match self {
            TransactionField::Description => "description",
            TransactionField::Date => "date",
            TransactionField::Amount => "amount",
            TransactionField::Type => "type",
            TransactionField::Category => "category",
            TransactionField::Source => "source_account_id",
            TransactionField::Destination => "destination_account_id",
        }
    }

    /// Whether every transaction has a value for this field.
    ///
    /// Required fields cannot be cleared.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            TransactionField::Date | TransactionField::Amount | TransactionField::Type
        )
    }

    /// Get the text form of this field's value on `transaction`.
    ///
    /// Returns `None` when an optional field has no value.
    pub fn get_value_from(self, transaction: &Transaction) -> Option<String> {
        match self {
            TransactionField::Description => transaction.description.clone(),
            TransactionField::Date => Some(transaction.date.to_string()),
            TransactionField::Amount => Some(transaction.amount.to_string()),
            TransactionField::Type => Some(transaction.transaction_type.to_string()),
            TransactionField::Category => transaction.category.clone(),
            TransactionField::Source => transaction.source_account_id.map(|id| id.to_string()),
            TransactionField::Destination => {
                transaction.destination_account_id.map(|id| id.to_string())
            }
        }
    }

    /// Parse `value` and assign it to this field on `transaction`.
    ///
    /// `None` clears optional fields. Account IDs are not checked against the
    /// account table here, the store rejects unknown accounts on write.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidOperation] if `value` is `None` for a required field,
    /// - [Error::ParseError] if `value` is not valid text for the field.
    ///
    /// `transaction` is left untouched when an error is returned.
    pub fn apply_value_to(
        self,
        transaction: &mut Transaction,
        value: Option<&str>,
    ) -> Result<(), Error> {
        match self.parse_value(value)? {
            FieldValue::Text(text) => match self {
                TransactionField::Category => transaction.category = text,
                _ => transaction.description = text,
            },
            FieldValue::Date(date) => transaction.date = date,
            FieldValue::Amount(amount) => transaction.amount = amount,
            FieldValue::Type(transaction_type) => transaction.transaction_type = transaction_type,
            FieldValue::Account(account_id) => match self {
                TransactionField::Source => transaction.source_account_id = account_id,
                _ => transaction.destination_account_id = account_id,
            },
        }

        Ok(())
    }

    /// Check that `value` could be assigned to this field without assigning it.
    ///
    /// # Errors
    /// Returns the same errors as [TransactionField::apply_value_to].
    pub fn validate_value(self, value: Option<&str>) -> Result<(), Error> {
        self.parse_value(value).map(|_| ())
    }

    fn parse_value(self, value: Option<&str>) -> Result<FieldValue, Error> {
        let text = match value {
            Some(text) => text,
            None if self.is_required() => {
                return Err(Error::InvalidOperation(format!(
                    "{self} is required and cannot be cleared"
                )));
            }
            None => {
                return Ok(match self {
                    TransactionField::Source | TransactionField::Destination => {
                        FieldValue::Account(None)
                    }
                    _ => FieldValue::Text(None),
                });
            }
        };

        let parse_error = |reason: String| Error::ParseError {
            field: self.to_string(),
            value: text.to_owned(),
            reason,
        };

        match self {
            TransactionField::Description | TransactionField::Category => {
                Ok(FieldValue::Text(Some(text.to_owned())))
            }
            TransactionField::Date => Date::parse(text.trim(), DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|error| parse_error(error.to_string())),
            TransactionField::Amount => text
                .trim()
                .parse::<Decimal>()
                .map(FieldValue::Amount)
                .map_err(|error| parse_error(error.to_string())),
            TransactionField::Type => text
                .trim()
                .parse::<TransactionType>()
                .map(FieldValue::Type)
                .map_err(|error| parse_error(error.to_string())),
            TransactionField::Source | TransactionField::Destination => {
                Uuid::parse_str(text.trim())
                    .map(|id| FieldValue::Account(Some(id)))
                    .map_err(|error| parse_error(error.to_string()))
            }
        }
    }
}

impl Display for TransactionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
