//! Triggers are the predicates that decide whether a rule applies to a transaction.

use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{Error, rule::field::TransactionField, transaction::Transaction};

/// How a trigger compares a field's text against its literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// The field starts with the literal, ignoring case.
    StartsWith,
    /// The field ends with the literal, ignoring case.
    EndsWith,
    /// The field contains the literal, ignoring case.
    Contains,
    /// The field is exactly the literal, case included.
    IsExactly,
    /// The field sorts after the literal, comparing code points.
    GreaterThan,
    /// The field sorts before the literal, comparing code points.
    LessThan,
    /// The field has a value that is not just whitespace. The literal is ignored.
    Exists,
}

impl Condition {
    /// Compare a field's text against `literal`.
    ///
    /// GreaterThan and LessThan compare text, not numbers or dates, so "9" is
    /// greater than "10".
    pub fn compare(self, value: &str, literal: &str) -> bool {
        match self {
            Condition::StartsWith => fold_case(value).starts_with(&fold_case(literal)),
            Condition::EndsWith => fold_case(value).ends_with(&fold_case(literal)),
            Condition::Contains => fold_case(value).contains(&fold_case(literal)),
            Condition::IsExactly => value == literal,
            Condition::GreaterThan => value.cmp(literal) == Ordering::Greater,
            Condition::LessThan => value.cmp(literal) == Ordering::Less,
            Condition::Exists => !value.trim().is_empty(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Condition::StartsWith => "Starts With",
            Condition::EndsWith => "Ends With",
            Condition::Contains => "Contains",
            Condition::IsExactly => "Is Exactly",
            Condition::GreaterThan => "Greater Than",
            Condition::LessThan => "Less Than",
            Condition::Exists => "Exists",
        }
    }
}

/// Lowercase each character on its own.
///
/// Unlike [str::to_lowercase] this has no context rules, so a word-final `Σ`
/// folds to `σ` like every other `Σ`.
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// A single test against one transaction field, e.g. "Description starts with COFFEE".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// The field to test.
    pub field: TransactionField,
    /// Invert the result of the test.
    #[serde(rename = "not", default)]
    pub negate: bool,
    /// How to compare the field against `literal`.
    pub condition: Condition,
    /// The text to compare against. Only optional for [Condition::Exists].
    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Trigger {
    /// Create a trigger that tests `field` with `condition` against `literal`.
    pub fn new(field: TransactionField, condition: Condition, literal: Option<&str>) -> Self {
        Self {
            field,
            negate: false,
            condition,
            literal: literal.map(str::to_owned),
        }
    }

    /// Invert the trigger.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Check whether `transaction` passes this trigger.
    ///
    /// A field without a value never matches, except that [Condition::Exists]
    /// reports it as not existing. Negation is applied last, so a negated
    /// trigger matches fields without a value.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let literal = self.literal.as_deref().unwrap_or_default();
        let result = self
            .field
            .get_value_from(transaction)
            .is_some_and(|value| self.condition.compare(&value, literal));

        if self.negate { !result } else { result }
    }

    /// Check the invariants of a trigger received from a client.
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] if the trigger has no literal but its
    /// condition needs one.
    pub fn validate(&self) -> Result<(), Error> {
        if self.literal.is_none() && self.condition != Condition::Exists {
            return Err(Error::InvalidRequest {
                field: "triggers".to_owned(),
                message: format!(
                    "the trigger \"{self}\" needs a value to compare {} against",
                    self.field
                ),
            });
        }

        Ok(())
    }
}

impl Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "When {} ", self.field)?;

        if self.negate {
            f.write_str("Not ")?;
        }

        f.write_str(self.condition.label())?;

        match &self.literal {
            Some(literal) => write!(f, " {literal}"),
            None => Ok(()),
        }
    }
}
