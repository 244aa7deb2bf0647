//! Translates triggers into SQL that narrows the transactions a rule looks at.
//!
//! The SQL is only a prefilter. It must never exclude a transaction that
//! [Trigger::matches] would accept, but it may include transactions that the
//! evaluator later rejects.

use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{
    Error,
    rule::{
        runner::DateRange,
        trigger::{Condition, Trigger},
    },
    transaction::{TRANSACTION_COLUMNS, Transaction, map_transaction_row},
};

/// Every character that [str::trim] removes, as arguments to SQLite's `char()`.
const WHITESPACE_CODE_POINTS: &str = "9, 10, 11, 12, 13, 32, 133, 160, 5760, 8192, 8193, 8194, \
     8195, 8196, 8197, 8198, 8199, 8200, 8201, 8202, 8232, 8233, 8239, 8287, 12288";

/// How the predicates of several triggers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    /// Every trigger must hold.
    All,
    /// At least one trigger must hold.
    Any,
}

/// A parameterised SELECT over the transaction table.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingQuery {
    sql: String,
    params: Vec<Value>,
}

/// A trigger rendered as SQL, `None` when the trigger cannot narrow the
/// candidates and must be treated as always true.
type Predicate = Option<(String, Vec<Value>)>;

impl MatchingQuery {
    /// Build a query for the non-deleted transactions in `range` that satisfy
    /// `triggers` combined with `conjunction`, ordered by date then ID.
    pub fn new(
        triggers: &[Trigger],
        conjunction: Conjunction,
        range: &DateRange,
        limit: Option<u64>,
    ) -> Self {
        let mut sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" \
             WHERE is_deleted = 0 AND date BETWEEN ? AND ?"
        );
        let mut params = vec![
            Value::Text(range.start().to_string()),
            Value::Text(range.end().to_string()),
        ];

        if let Some((clause, clause_params)) = combine(triggers, conjunction) {
            sql.push_str(" AND ");
            sql.push_str(&clause);
            params.extend(clause_params);
        }

        sql.push_str(" ORDER BY date, id");

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        Self { sql, params }
    }

    /// Run the query and return every row.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the query fails or a row cannot be read.
    pub fn fetch(&self, connection: &Connection) -> Result<Vec<Transaction>, Error> {
        self.fetch_filtered(connection, |_| true, None)
    }

    /// Run the query, keeping only the rows for which `keep` returns `true`,
    /// and stop once `limit` rows have been kept.
    ///
    /// Rows are read one at a time, so a small `limit` does not load the whole
    /// date range into memory.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the query fails or a row cannot be read.
    pub fn fetch_filtered<F>(
        &self,
        connection: &Connection,
        mut keep: F,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, Error>
    where
        F: FnMut(&Transaction) -> bool,
    {
        let mut stmt = connection.prepare(&self.sql)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), map_transaction_row)?;

        let mut kept = Vec::new();

        for row in rows {
            if limit.is_some_and(|limit| kept.len() >= limit) {
                break;
            }

            let transaction = row?;

            if keep(&transaction) {
                kept.push(transaction);
            }
        }

        Ok(kept)
    }
}

/// Build the store-level query for `triggers` joined with AND, restricted to
/// `range` and returning at most `limit` rows.
pub fn build_query(triggers: &[Trigger], range: &DateRange, limit: Option<u64>) -> MatchingQuery {
    MatchingQuery::new(triggers, Conjunction::All, range, limit)
}

fn combine(triggers: &[Trigger], conjunction: Conjunction) -> Predicate {
    let predicates = triggers.iter().map(trigger_predicate);

    match conjunction {
        Conjunction::All => {
            let narrowing: Vec<_> = predicates.flatten().collect();
            join(narrowing, " AND ")
        }
        // An empty OR is false: a loose rule without triggers never fires.
        Conjunction::Any if triggers.is_empty() => Some(("0".to_owned(), Vec::new())),
        Conjunction::Any => {
            // One trigger that cannot narrow makes the whole disjunction true.
            let narrowing: Option<Vec<_>> = predicates.collect();
            join(narrowing?, " OR ")
        }
    }
}

fn join(predicates: Vec<(String, Vec<Value>)>, separator: &str) -> Predicate {
    if predicates.is_empty() {
        return None;
    }

    let (clauses, params): (Vec<_>, Vec<_>) = predicates.into_iter().unzip();

    Some((
        format!("({})", clauses.join(separator)),
        params.into_iter().flatten().collect(),
    ))
}

fn trigger_predicate(trigger: &Trigger) -> Predicate {
    let column = trigger.field.column_name();
    let literal = trigger.literal.as_deref().unwrap_or_default();

    let (test, params) = match trigger.condition {
        Condition::StartsWith => like(column, literal, "", "%")?,
        Condition::EndsWith => like(column, literal, "%", "")?,
        Condition::Contains => like(column, literal, "%", "%")?,
        Condition::IsExactly => (
            format!("{column} = ?"),
            vec![Value::Text(literal.to_owned())],
        ),
        Condition::GreaterThan => (
            format!("{column} > ?"),
            vec![Value::Text(literal.to_owned())],
        ),
        Condition::LessThan => (
            format!("{column} < ?"),
            vec![Value::Text(literal.to_owned())],
        ),
        Condition::Exists => (
            format!("TRIM({column}, char({WHITESPACE_CODE_POINTS})) <> ''"),
            Vec::new(),
        ),
    };

    // The NULL check keeps the predicate two-valued so that NOT is an exact
    // complement, matching how the evaluator treats missing values.
    let predicate = format!("({column} IS NOT NULL AND {test})");

    if trigger.negate {
        Some((format!("NOT {predicate}"), params))
    } else {
        Some((predicate, params))
    }
}

/// A case-insensitive LIKE test, or `None` if SQLite's LIKE cannot agree with
/// Unicode lowercasing for `literal`.
fn like(column: &str, literal: &str, prefix: &str, suffix: &str) -> Option<(String, Vec<Value>)> {
    if !can_fold_with_like(literal) {
        return None;
    }

    let pattern = format!("{prefix}{}{suffix}", escape_like(literal));

    Some((
        format!("{column} LIKE ? ESCAPE '\\'"),
        vec![Value::Text(pattern)],
    ))
}

/// LIKE only folds ASCII letters. Unicode lowercasing also maps U+0130 and
/// U+212A onto `i` and `k`, so literals containing those letters are left to
/// the evaluator.
fn can_fold_with_like(literal: &str) -> bool {
    literal.is_ascii()
        && !literal
            .chars()
            .any(|c| matches!(c.to_ascii_lowercase(), 'i' | 'k'))
}

fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());

    for c in literal.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
