//! Actions are the mutations a rule makes to the transactions it fires on.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, rule::field::TransactionField, transaction::Transaction};

/// What an [Action] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Add text to the end of the field's current text.
    Append,
    /// Replace the field's value.
    Set,
    /// Remove the field's value.
    Clear,
    /// Flag the transaction as deleted.
    DeleteTransaction,
}

/// A single mutation, e.g. "set Category to Dining".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// What to do.
    #[serde(rename = "actionType")]
    pub kind: ActionKind,
    /// The field to change. Required for every kind except
    /// [ActionKind::DeleteTransaction], which ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<TransactionField>,
    /// The text to append or set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Action {
    /// Create an action that appends `value` to `field`.
    pub fn append(field: TransactionField, value: &str) -> Self {
        Self {
            kind: ActionKind::Append,
            field: Some(field),
            value: Some(value.to_owned()),
        }
    }

    /// Create an action that sets `field` to `value`.
    pub fn set(field: TransactionField, value: &str) -> Self {
        Self {
            kind: ActionKind::Set,
            field: Some(field),
            value: Some(value.to_owned()),
        }
    }

    /// Create an action that clears `field`.
    pub fn clear(field: TransactionField) -> Self {
        Self {
            kind: ActionKind::Clear,
            field: Some(field),
            value: None,
        }
    }

    /// Create an action that flags transactions as deleted.
    pub fn delete_transaction() -> Self {
        Self {
            kind: ActionKind::DeleteTransaction,
            field: None,
            value: None,
        }
    }

    /// Mutate `transaction` in place.
    ///
    /// Append concatenates text with no separator, even for amounts and dates,
    /// and behaves like Set when the field has no value.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidOperation] if the action has no field but needs one, or
    ///   clears a required field,
    /// - [Error::ParseError] if the resulting text is not valid for the field.
    pub fn apply_to(&self, transaction: &mut Transaction) -> Result<(), Error> {
        match self.kind {
            ActionKind::Append => {
                let field = self.target_field()?;
                let value = match field.get_value_from(transaction) {
                    Some(current) => Some(current + self.value.as_deref().unwrap_or_default()),
                    None => self.value.clone(),
                };

                field.apply_value_to(transaction, value.as_deref())
            }
            ActionKind::Set => self
                .target_field()?
                .apply_value_to(transaction, self.value.as_deref()),
            ActionKind::Clear => self.target_field()?.apply_value_to(transaction, None),
            ActionKind::DeleteTransaction => {
                transaction.is_deleted = true;
                Ok(())
            }
        }
    }

    /// Check the invariants of an action received from a client.
    ///
    /// Set and Clear are checked against the field's type so that a rule which
    /// can never succeed is rejected before it runs. Append is only checked for
    /// a field, since its result depends on each transaction.
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] naming the `actions` field.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: String| Error::InvalidRequest {
            field: "actions".to_owned(),
            message,
        };

        match self.kind {
            ActionKind::DeleteTransaction => Ok(()),
            ActionKind::Append => self
                .target_field()
                .map(|_| ())
                .map_err(|error| invalid(error.to_string())),
            ActionKind::Set => self
                .target_field()
                .and_then(|field| field.validate_value(self.value.as_deref()))
                .map_err(|error| invalid(error.to_string())),
            ActionKind::Clear => self
                .target_field()
                .and_then(|field| field.validate_value(None))
                .map_err(|error| invalid(error.to_string())),
        }
    }

    fn target_field(&self) -> Result<TransactionField, Error> {
        self.field.ok_or_else(|| {
            Error::InvalidOperation(format!("the action {:?} needs a field", self.kind))
        })
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.kind {
            ActionKind::Append => "Append",
            ActionKind::Set => "Set",
            ActionKind::Clear => "Clear",
            ActionKind::DeleteTransaction => "Delete Transaction",
        };
        f.write_str(label)?;

        if let Some(field) = self.field {
            write!(
                f,
                " {field} to {}",
                self.value.as_deref().unwrap_or_default()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error,
        rule::field::TransactionField,
        transaction::Transaction,
    };

    use super::{Action, ActionKind};

    fn transaction_described_as(description: Option<&str>) -> Transaction {
        Transaction::build(Decimal::new(1234, 2), date!(2024 - 10 - 01), "")
            .description(description)
            .finalise()
    }

    #[test]
    fn append_concatenates_without_separator() {
        let mut transaction = transaction_described_as(Some("starting"));

        Action::append(TransactionField::Description, "new value")
            .apply_to(&mut transaction)
            .unwrap();

        assert_eq!(transaction.description.as_deref(), Some("startingnew value"));
    }

    #[test]
    fn append_to_missing_value_behaves_like_set() {
        let mut appended = transaction_described_as(None);
        let mut set = appended.clone();

        Action::append(TransactionField::Description, "new value")
            .apply_to(&mut appended)
            .unwrap();
        Action::set(TransactionField::Description, "new value")
            .apply_to(&mut set)
            .unwrap();

        assert_eq!(appended, set);
        assert_eq!(appended.description.as_deref(), Some("new value"));
    }

    #[test]
    fn append_is_not_idempotent() {
        let mut transaction = transaction_described_as(Some("Rent"));
        let action = Action::append(TransactionField::Description, " (reviewed)");

        action.apply_to(&mut transaction).unwrap();
        action.apply_to(&mut transaction).unwrap();

        assert_eq!(
            transaction.description.as_deref(),
            Some("Rent (reviewed) (reviewed)")
        );
    }

    #[test]
    fn append_to_amount_is_text_concatenation() {
        let mut transaction = transaction_described_as(None);

        Action::append(TransactionField::Amount, "0")
            .apply_to(&mut transaction)
            .unwrap();

        assert_eq!(transaction.amount.to_string(), "12.340");
    }

    #[test]
    fn append_that_breaks_the_field_type_fails() {
        let mut transaction = transaction_described_as(None);

        let result = Action::append(TransactionField::Date, "x").apply_to(&mut transaction);

        assert!(matches!(result, Err(Error::ParseError { .. })));
    }

    #[test]
    fn set_replaces_the_value() {
        let mut transaction = transaction_described_as(Some("starting"));

        Action::set(TransactionField::Description, "new value")
            .apply_to(&mut transaction)
            .unwrap();

        assert_eq!(transaction.description.as_deref(), Some("new value"));
    }

    #[test]
    fn clear_ignores_the_value() {
        let mut transaction = transaction_described_as(Some("starting"));
        let action = Action {
            kind: ActionKind::Clear,
            field: Some(TransactionField::Description),
            value: Some("unused".to_owned()),
        };

        action.apply_to(&mut transaction).unwrap();

        assert_eq!(TransactionField::Description.get_value_from(&transaction), None);
    }

    #[test]
    fn clear_on_required_field_fails() {
        let mut transaction = transaction_described_as(None);

        let result = Action::clear(TransactionField::Amount).apply_to(&mut transaction);

        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn delete_only_sets_the_flag() {
        let mut transaction = transaction_described_as(Some("starting"));
        let mut want = transaction.clone();
        want.is_deleted = true;

        Action::delete_transaction().apply_to(&mut transaction).unwrap();

        assert_eq!(transaction, want);
    }

    #[test]
    fn actions_without_a_field_fail() {
        let mut transaction = transaction_described_as(None);
        let action = Action {
            kind: ActionKind::Set,
            field: None,
            value: Some("Dining".to_owned()),
        };

        assert!(matches!(
            action.apply_to(&mut transaction),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(action.validate(), Err(Error::InvalidRequest { .. })));
    }

    #[test]
    fn validate_rejects_actions_that_cannot_succeed() {
        assert_eq!(Action::set(TransactionField::Category, "Dining").validate(), Ok(()));
        assert_eq!(Action::delete_transaction().validate(), Ok(()));
        assert_eq!(Action::append(TransactionField::Date, "x").validate(), Ok(()));
        assert!(Action::clear(TransactionField::Type).validate().is_err());
        assert!(Action::set(TransactionField::Amount, "lots").validate().is_err());
    }

    #[test]
    fn display_reads_like_a_sentence() {
        assert_eq!(
            Action::set(TransactionField::Category, "Dining").to_string(),
            "Set Category to Dining"
        );
        assert_eq!(Action::delete_transaction().to_string(), "Delete Transaction");
    }

    #[test]
    fn json_omits_missing_fields() {
        let json = serde_json::to_string(&Action::delete_transaction()).unwrap();

        assert_eq!(json, r#"{"actionType":"DeleteTransaction"}"#);
        assert_eq!(
            serde_json::from_str::<Action>(&json).unwrap(),
            Action::delete_transaction()
        );
    }
}
