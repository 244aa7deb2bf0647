//! Running rules over the transactions in a date range.

use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    rule::{
        group::get_rule_group,
        models::Rule,
        query::{Conjunction, MatchingQuery},
    },
    transaction::{Transaction, update_transactions},
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Create a range from `start` to `end`, both inclusive.
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        Self::checked(start, end, "startDate")
    }

    /// Parse a range from the `startDate` and `endDate` fields of a request,
    /// both `yyyy-MM-dd`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidDateFormat] if either string is not a valid date,
    /// - [Error::InvalidRequest] if `start` is after `end`.
    pub fn parse(start: &str, end: &str) -> Result<Self, Error> {
        Self::parse_fields(("startDate", start), ("endDate", end))
    }

    /// Parse a range from two `(field name, yyyy-MM-dd)` pairs.
    ///
    /// Errors name the field that was rejected.
    ///
    /// # Errors
    /// Returns the same errors as [DateRange::parse].
    pub fn parse_fields(
        (start_field, start): (&str, &str),
        (end_field, end): (&str, &str),
    ) -> Result<Self, Error> {
        Self::checked(
            parse_date(start_field, start)?,
            parse_date(end_field, end)?,
            start_field,
        )
    }

    fn checked(start: Date, end: Date, start_field: &str) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidRequest {
                field: start_field.to_owned(),
                message: format!("the start date {start} is after the end date {end}"),
            });
        }

        Ok(Self { start, end })
    }

    /// The first day of the range.
    pub fn start(&self) -> Date {
        self.start
    }

    /// The last day of the range.
    pub fn end(&self) -> Date {
        self.end
    }
}

fn parse_date(field: &str, text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|error| Error::InvalidDateFormat {
        field: field.to_owned(),
        value: text.to_owned(),
        reason: error.to_string(),
    })
}

/// The body of a request to run one or more rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRuleRequest {
    pub start_date: String,
    pub end_date: String,
}

impl RunRuleRequest {
    /// Parse the request's dates.
    ///
    /// # Errors
    /// Returns the same errors as [DateRange::parse].
    pub fn date_range(&self) -> Result<DateRange, Error> {
        DateRange::parse(&self.start_date, &self.end_date)
    }
}

/// Run `rule` over the transactions in `range` and save the changes.
///
/// Returns the number of transactions the rule fired on.
///
/// # Errors
/// This function will return a:
/// - [Error::RuleApplicationFailed] if an action fails on a transaction,
/// - [Error::InvalidRequest] if an action points a transaction at a missing account,
/// - [Error::SqlError] if there is some other SQL error.
///
/// Nothing is saved when an error is returned.
pub fn run_rule(rule: &Rule, range: &DateRange, connection: &Connection) -> Result<usize, Error> {
    run_rules(std::slice::from_ref(rule), range, connection)
}

/// Run each of `rules` in order over the transactions in `range`.
///
/// Each rule sees the changes made by the rules before it. Returns the total
/// number of times a rule fired, so a transaction that two rules fire on is
/// counted twice.
///
/// # Errors
/// Returns the same errors as [run_rule]. All rules are run in one SQL
/// transaction, so a failure in any rule discards the changes of every rule.
pub fn run_rules(rules: &[Rule], range: &DateRange, connection: &Connection) -> Result<usize, Error> {
    let start_time = std::time::Instant::now();
    let sql_transaction = connection.unchecked_transaction()?;

    let mut count = 0;
    for rule in rules {
        count += apply_rule(rule, range, &sql_transaction).inspect_err(|error| {
            tracing::error!(
                "Failed to run rule \"{}\" after {}ms: {error}",
                rule.name,
                start_time.elapsed().as_millis()
            );
        })?;
    }

    sql_transaction.commit()?;

    tracing::info!(
        "Ran {} rules from {} to {} in {}ms: {count} transactions changed",
        rules.len(),
        range.start(),
        range.end(),
        start_time.elapsed().as_millis()
    );

    Ok(count)
}

/// Run the rules in the group called `group_name`, in creation order.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no group called `group_name`,
/// - the same errors as [run_rules].
pub fn run_rule_group(
    group_name: &str,
    range: &DateRange,
    connection: &Connection,
) -> Result<usize, Error> {
    let group = get_rule_group(group_name, connection)?;

    run_rules(&group.rules, range, connection)
}

/// Find up to `limit` transactions in `range` that `rule` would fire on,
/// without changing them.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn find_matching_transactions(
    rule: &Rule,
    range: &DateRange,
    limit: usize,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    prefilter(rule, range).fetch_filtered(
        connection,
        |transaction| rule.should_trigger_for(transaction),
        Some(limit),
    )
}

/// A query for every transaction `rule` might fire on.
fn prefilter(rule: &Rule, range: &DateRange) -> MatchingQuery {
    let conjunction = if rule.is_strict {
        Conjunction::All
    } else {
        Conjunction::Any
    };

    MatchingQuery::new(&rule.triggers, conjunction, range, None)
}

fn apply_rule(rule: &Rule, range: &DateRange, connection: &Connection) -> Result<usize, Error> {
    tracing::debug!("Running rule \"{}\": {}", rule.name, rule.summary());

    let candidates = prefilter(rule, range).fetch_filtered(
        connection,
        |transaction| rule.should_trigger_for(transaction),
        None,
    )?;

    let mut changed = Vec::with_capacity(candidates.len());

    for mut transaction in candidates {
        rule.apply_actions_to(&mut transaction)
            .map_err(|error| Error::RuleApplicationFailed {
                rule_id: rule.id,
                transaction_id: transaction.id,
                source: Box::new(error),
            })?;

        tracing::debug!("Rule \"{}\" fired on transaction {}", rule.name, transaction.id);
        changed.push(transaction);
    }

    update_transactions(&changed, connection)?;

    Ok(changed.len())
}

#[cfg(test)]
mod date_range_tests {
    use time::macros::date;

    use crate::Error;

    use super::DateRange;

    #[test]
    fn parses_iso_dates() {
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();

        assert_eq!(range.start(), date!(2025 - 01 - 01));
        assert_eq!(range.end(), date!(2025 - 01 - 31));
    }

    #[test]
    fn single_day_is_valid() {
        assert!(DateRange::parse("2025-01-01", "2025-01-01").is_ok());
    }

    #[test]
    fn malformed_date_is_invalid_format() {
        let result = DateRange::parse("2025-01-01", "31/01/2025");

        assert!(matches!(
            result,
            Err(Error::InvalidDateFormat { field, value, .. })
                if field == "endDate" && value == "31/01/2025"
        ));
    }

    #[test]
    fn errors_name_the_rejected_field() {
        let malformed = DateRange::parse_fields(("start", "01/01/2025"), ("end", "2025-01-31"));
        let reversed = DateRange::parse_fields(("start", "2025-02-01"), ("end", "2025-01-31"));

        assert!(matches!(
            malformed,
            Err(Error::InvalidDateFormat { field, .. }) if field == "start"
        ));
        assert!(matches!(
            reversed,
            Err(Error::InvalidRequest { field, .. }) if field == "start"
        ));
    }

    #[test]
    fn reversed_range_is_invalid() {
        let result = DateRange::parse("2025-02-01", "2025-01-01");

        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    }
}
