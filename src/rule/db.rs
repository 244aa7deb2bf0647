use rusqlite::{Connection, Row, types::Type};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    Error,
    rule::models::{Rule, RuleId, RuleRequest},
    transaction::parse_column,
};

const RULE_COLUMNS: &str = "id, name, is_strict, triggers, actions, rule_group_name";

/// Validate `request` and create a rule from it.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRequest] if the request fails [RuleRequest::validate],
/// - [Error::JSONSerializationError] if the triggers or actions cannot be serialized,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_rule(request: &RuleRequest, connection: &Connection) -> Result<Rule, Error> {
    request.validate(connection)?;

    let rule = Rule {
        id: Uuid::new_v4(),
        name: request.name.clone(),
        is_strict: request.is_strict,
        triggers: request.triggers.clone(),
        actions: request.actions.clone(),
        rule_group_name: request.rule_group_name.clone(),
    };

    connection.execute(
        "INSERT INTO rule (id, name, is_strict, triggers, actions, rule_group_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            rule.id.to_string(),
            &rule.name,
            rule.is_strict,
            to_json(&rule.triggers)?,
            to_json(&rule.actions)?,
            &rule.rule_group_name,
        ),
    )?;

    Ok(rule)
}

/// Retrieve a rule that has not been deleted by its `rule_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no such rule or it was deleted,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_rule(rule_id: RuleId, connection: &Connection) -> Result<Rule, Error> {
    connection
        .prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rule WHERE id = :id AND is_deleted = 0"
        ))?
        .query_one(&[(":id", &rule_id.to_string())], map_rule_row)
        .map_err(|error| error.into())
}

/// Retrieve every rule that has not been deleted, in creation order.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_rules(connection: &Connection) -> Result<Vec<Rule>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rule WHERE is_deleted = 0 ORDER BY rowid"
        ))?
        .query_map([], map_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the rules in the group called `group_name`, in creation order.
///
/// Returns an empty list if the group does not exist.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_rules_in_group(group_name: &str, connection: &Connection) -> Result<Vec<Rule>, Error> {
    connection
        .prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM rule
             WHERE rule_group_name = ?1 AND is_deleted = 0
             ORDER BY rowid"
        ))?
        .query_map([group_name], map_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Validate `request` and replace the rule `rule_id` with it.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingRule] if there is no such rule or it was deleted,
/// - the same errors as [create_rule].
pub fn update_rule(
    rule_id: RuleId,
    request: &RuleRequest,
    connection: &Connection,
) -> Result<Rule, Error> {
    request.validate(connection)?;

    let rows_affected = connection.execute(
        "UPDATE rule SET name = ?2, is_strict = ?3, triggers = ?4, actions = ?5, rule_group_name = ?6
         WHERE id = ?1 AND is_deleted = 0",
        (
            rule_id.to_string(),
            &request.name,
            request.is_strict,
            to_json(&request.triggers)?,
            to_json(&request.actions)?,
            &request.rule_group_name,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRule);
    }

    Ok(Rule {
        id: rule_id,
        name: request.name.clone(),
        is_strict: request.is_strict,
        triggers: request.triggers.clone(),
        actions: request.actions.clone(),
        rule_group_name: request.rule_group_name.clone(),
    })
}

/// Flag the rule `rule_id` as deleted.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRule] if there is no such rule or it was already deleted,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_rule(rule_id: RuleId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE rule SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
        [rule_id.to_string()],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRule);
    }

    Ok(())
}

/// Create the rule table. The rule group table must already exist.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_rule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rule (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                is_strict INTEGER NOT NULL,
                triggers TEXT NOT NULL,
                actions TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                rule_group_name TEXT,
                FOREIGN KEY(rule_group_name) REFERENCES rule_group(name)
            );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_rule_group_name ON rule(rule_group_name)",
        (),
    )?;

    Ok(())
}

fn map_rule_row(row: &Row) -> Result<Rule, rusqlite::Error> {
    let id = parse_column(row, 0)?;
    let name = row.get(1)?;
    let is_strict = row.get(2)?;
    let triggers = from_json(row, 3)?;
    let actions = from_json(row, 4)?;
    let rule_group_name = row.get(5)?;

    Ok(Rule {
        id,
        name,
        is_strict,
        triggers,
        actions,
        rule_group_name,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|error| Error::JSONSerializationError(error.to_string()))
}

fn from_json<T: DeserializeOwned>(row: &Row, index: usize) -> Result<T, rusqlite::Error> {
    let text: String = row.get(index)?;

    serde_json::from_str(&text)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

#[cfg(test)]
mod rule_db_tests {
    use rusqlite::Connection;
    use uuid::Uuid;

    use crate::{
        Error,
        db::initialize,
        rule::{
            action::Action,
            field::TransactionField,
            group::create_rule_group,
            models::RuleRequest,
            trigger::{Condition, Trigger},
        },
    };

    use super::{
        create_rule, delete_rule, get_all_rules, get_rule, get_rules_in_group, update_rule,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn request(name: &str) -> RuleRequest {
        RuleRequest {
            name: name.to_owned(),
            is_strict: true,
            triggers: vec![
                Trigger::new(TransactionField::Description, Condition::StartsWith, Some("COFFEE")),
                Trigger::new(TransactionField::Category, Condition::Exists, None).negated(),
            ],
            actions: vec![
                Action::set(TransactionField::Category, "Dining"),
                Action::delete_transaction(),
            ],
            rule_group_name: None,
        }
    }

    #[test]
    fn create_then_get_returns_the_same_rule() {
        let connection = get_test_connection();

        let created = create_rule(&request("Coffee"), &connection).unwrap();
        let got = get_rule(created.id, &connection).unwrap();

        assert_eq!(got, created);
        assert_eq!(got.triggers, request("Coffee").triggers);
        assert_eq!(got.actions, request("Coffee").actions);
    }

    #[test]
    fn create_rejects_invalid_request() {
        let connection = get_test_connection();

        let result = create_rule(&request(""), &connection);

        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
        assert_eq!(get_all_rules(&connection), Ok(vec![]));
    }

    #[test]
    fn get_missing_rule_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_rule(Uuid::new_v4(), &connection), Err(Error::NotFound));
    }

    #[test]
    fn get_all_returns_rules_in_creation_order() {
        let connection = get_test_connection();
        let names = ["Zebra", "Apple", "Mango"];
        for name in names {
            create_rule(&request(name), &connection).unwrap();
        }

        let got: Vec<_> = get_all_rules(&connection)
            .unwrap()
            .into_iter()
            .map(|rule| rule.name)
            .collect();

        assert_eq!(got, names);
    }

    #[test]
    fn get_rules_in_group_only_returns_members() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        let member = create_rule(
            &RuleRequest {
                rule_group_name: Some("Food".to_owned()),
                ..request("Coffee")
            },
            &connection,
        )
        .unwrap();
        create_rule(&request("Rent"), &connection).unwrap();

        assert_eq!(get_rules_in_group("Food", &connection), Ok(vec![member]));
    }

    #[test]
    fn update_replaces_every_field() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        let rule = create_rule(&request("Coffee"), &connection).unwrap();
        let new_request = RuleRequest {
            name: "Tea".to_owned(),
            is_strict: false,
            triggers: vec![],
            actions: vec![Action::clear(TransactionField::Category)],
            rule_group_name: Some("Food".to_owned()),
        };

        let updated = update_rule(rule.id, &new_request, &connection).unwrap();

        assert_eq!(get_rule(rule.id, &connection), Ok(updated.clone()));
        assert_eq!(updated.name, "Tea");
        assert!(!updated.is_strict);
        assert_eq!(updated.rule_group_name.as_deref(), Some("Food"));
    }

    #[test]
    fn update_missing_rule_fails() {
        let connection = get_test_connection();

        let result = update_rule(Uuid::new_v4(), &request("Coffee"), &connection);

        assert_eq!(result, Err(Error::UpdateMissingRule));
    }

    #[test]
    fn delete_is_soft() {
        let connection = get_test_connection();
        let rule = create_rule(&request("Coffee"), &connection).unwrap();

        delete_rule(rule.id, &connection).unwrap();

        assert_eq!(get_rule(rule.id, &connection), Err(Error::NotFound));
        assert_eq!(get_all_rules(&connection), Ok(vec![]));
        let is_deleted: bool = connection
            .query_row(
                "SELECT is_deleted FROM rule WHERE id = ?1",
                [rule.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(is_deleted);
    }

    #[test]
    fn delete_twice_fails() {
        let connection = get_test_connection();
        let rule = create_rule(&request("Coffee"), &connection).unwrap();

        delete_rule(rule.id, &connection).unwrap();

        assert_eq!(delete_rule(rule.id, &connection), Err(Error::DeleteMissingRule));
    }
}
