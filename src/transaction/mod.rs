//! Transactions are the records that rules inspect and mutate.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, loading and batch updating transactions

mod core;

pub use self::core::{
    TRANSACTION_COLUMNS, Transaction, TransactionBuilder, TransactionId,
    TransactionType, create_transaction, create_transaction_table, get_transaction,
    map_transaction_row, update_transactions,
};
pub(crate) use self::core::parse_column;

#[cfg(test)]
pub use self::core::count_transactions;
