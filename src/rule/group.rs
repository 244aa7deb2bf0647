//! Rule groups are named sets of rules that can be run together.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    rule::{
        db::{get_all_rules, get_rules_in_group},
        models::Rule,
    },
};

/// The key that [list_rule_groups] files rules without a group under.
pub const UNGROUPED: &str = "(ungrouped)";

/// A rule group and the rules in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleGroup {
    /// The group's name, which is also its identity.
    pub name: String,
    /// The group's rules, in creation order.
    pub rules: Vec<Rule>,
}

/// The body of a request to create or rename a rule group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleGroupRequest {
    pub name: String,
}

/// Create the rule group table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_rule_group_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rule_group (name TEXT PRIMARY KEY NOT NULL)",
        (),
    )?;

    Ok(())
}

/// Create an empty rule group called `name`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRequest] if `name` is blank or reserved,
/// - [Error::DuplicateRuleGroupName] if the name is taken,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_rule_group(name: &str, connection: &Connection) -> Result<RuleGroup, Error> {
    validate_name(name)?;

    connection
        .execute("INSERT INTO rule_group (name) VALUES (?1)", [name])
        .map_err(|error| match error {
            // Code 1555 occurs when a PRIMARY KEY constraint failed.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 1555 => {
                Error::DuplicateRuleGroupName(name.to_owned())
            }
            error => error.into(),
        })?;

    Ok(RuleGroup {
        name: name.to_owned(),
        rules: Vec::new(),
    })
}

/// Check whether a rule group called `name` exists.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn rule_group_exists(name: &str, connection: &Connection) -> Result<bool, Error> {
    let found = connection
        .query_row("SELECT 1 FROM rule_group WHERE name = ?1", [name], |_| Ok(()))
        .optional()?;

    Ok(found.is_some())
}

/// Retrieve the rule group called `name` with its rules.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no such group,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_rule_group(name: &str, connection: &Connection) -> Result<RuleGroup, Error> {
    if !rule_group_exists(name, connection)? {
        return Err(Error::NotFound);
    }

    Ok(RuleGroup {
        name: name.to_owned(),
        rules: get_rules_in_group(name, connection)?,
    })
}

/// Map every rule group name to its rules.
///
/// Rules without a group are listed under [UNGROUPED], which is always present.
/// Empty groups are listed with no rules.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_rule_groups(connection: &Connection) -> Result<BTreeMap<String, Vec<Rule>>, Error> {
    let mut groups: BTreeMap<String, Vec<Rule>> = connection
        .prepare("SELECT name FROM rule_group")?
        .query_map([], |row| row.get::<_, String>(0))?
        .map(|maybe_name| maybe_name.map(|name| (name, Vec::new())))
        .collect::<Result<_, _>>()?;

    groups.insert(UNGROUPED.to_owned(), Vec::new());

    for rule in get_all_rules(connection)? {
        let key = rule.rule_group_name.as_deref().unwrap_or(UNGROUPED);

        if let Some(rules) = groups.get_mut(key) {
            rules.push(rule);
        }
    }

    Ok(groups)
}

/// Rename the group `old_name` to `new_name`, moving its rules with it.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingRuleGroup] if there is no group called `old_name`,
/// - the same errors as [create_rule_group] for `new_name`.
///
/// Nothing is changed when an error is returned.
pub fn rename_rule_group(
    old_name: &str,
    new_name: &str,
    connection: &Connection,
) -> Result<RuleGroup, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    if !rule_group_exists(old_name, &sql_transaction)? {
        return Err(Error::UpdateMissingRuleGroup);
    }

    if old_name != new_name {
        create_rule_group(new_name, &sql_transaction)?;
        sql_transaction.execute(
            "UPDATE rule SET rule_group_name = ?2 WHERE rule_group_name = ?1",
            [old_name, new_name],
        )?;
        sql_transaction.execute("DELETE FROM rule_group WHERE name = ?1", [old_name])?;
    }

    let group = get_rule_group(new_name, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(group)
}

/// Delete the group called `name`. Its rules are kept without a group.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRuleGroup] if there is no such group,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_rule_group(name: &str, connection: &Connection) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    sql_transaction.execute(
        "UPDATE rule SET rule_group_name = NULL WHERE rule_group_name = ?1",
        [name],
    )?;
    let rows_affected =
        sql_transaction.execute("DELETE FROM rule_group WHERE name = ?1", [name])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRuleGroup);
    }

    sql_transaction.commit()?;

    Ok(())
}

fn validate_name(name: &str) -> Result<(), Error> {
    let message = if name.trim().is_empty() {
        "Rule group name cannot be empty"
    } else if name == UNGROUPED {
        "This name is reserved for rules without a group"
    } else {
        return Ok(());
    };

    Err(Error::InvalidRequest {
        field: "name".to_owned(),
        message: message.to_owned(),
    })
}

#[cfg(test)]
mod rule_group_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        rule::{
            db::{create_rule, delete_rule, get_rule},
            models::RuleRequest,
        },
    };

    use super::{
        UNGROUPED, create_rule_group, delete_rule_group, get_rule_group, list_rule_groups,
        rename_rule_group, rule_group_exists,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn rule_request(name: &str, group: Option<&str>) -> RuleRequest {
        RuleRequest {
            name: name.to_owned(),
            is_strict: true,
            triggers: vec![],
            actions: vec![],
            rule_group_name: group.map(str::to_owned),
        }
    }

    #[test]
    fn create_then_get() {
        let connection = get_test_connection();

        let created = create_rule_group("Food", &connection).unwrap();

        assert_eq!(get_rule_group("Food", &connection), Ok(created));
        assert_eq!(rule_group_exists("Food", &connection), Ok(true));
        assert_eq!(rule_group_exists("Rent", &connection), Ok(false));
    }

    #[test]
    fn create_rejects_bad_names() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();

        assert_eq!(
            create_rule_group("Food", &connection),
            Err(Error::DuplicateRuleGroupName("Food".to_owned()))
        );
        assert!(matches!(
            create_rule_group(" ", &connection),
            Err(Error::InvalidRequest { .. })
        ));
        assert!(matches!(
            create_rule_group(UNGROUPED, &connection),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn get_missing_group_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_rule_group("Nope", &connection), Err(Error::NotFound));
    }

    #[test]
    fn group_lists_its_live_rules() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        let coffee = create_rule(&rule_request("Coffee", Some("Food")), &connection).unwrap();
        let tea = create_rule(&rule_request("Tea", Some("Food")), &connection).unwrap();
        create_rule(&rule_request("Rent", None), &connection).unwrap();
        delete_rule(tea.id, &connection).unwrap();

        let group = get_rule_group("Food", &connection).unwrap();

        assert_eq!(group.rules, vec![coffee]);
    }

    #[test]
    fn list_includes_ungrouped_and_empty_groups() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        create_rule_group("Empty", &connection).unwrap();
        let coffee = create_rule(&rule_request("Coffee", Some("Food")), &connection).unwrap();
        let rent = create_rule(&rule_request("Rent", None), &connection).unwrap();

        let groups = list_rule_groups(&connection).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups["Food"], vec![coffee]);
        assert!(groups["Empty"].is_empty());
        assert_eq!(groups[UNGROUPED], vec![rent]);
    }

    #[test]
    fn list_without_groups_still_has_ungrouped_key() {
        let connection = get_test_connection();

        let groups = list_rule_groups(&connection).unwrap();

        assert_eq!(groups.keys().collect::<Vec<_>>(), [UNGROUPED]);
    }

    #[test]
    fn rename_moves_rules() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        let coffee = create_rule(&rule_request("Coffee", Some("Food")), &connection).unwrap();

        let renamed = rename_rule_group("Food", "Dining", &connection).unwrap();

        assert_eq!(renamed.name, "Dining");
        assert_eq!(renamed.rules.len(), 1);
        assert_eq!(
            get_rule(coffee.id, &connection).unwrap().rule_group_name.as_deref(),
            Some("Dining")
        );
        assert_eq!(rule_group_exists("Food", &connection), Ok(false));
    }

    #[test]
    fn rename_to_taken_name_changes_nothing() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        create_rule_group("Dining", &connection).unwrap();
        let coffee = create_rule(&rule_request("Coffee", Some("Food")), &connection).unwrap();

        let result = rename_rule_group("Food", "Dining", &connection);

        assert_eq!(result, Err(Error::DuplicateRuleGroupName("Dining".to_owned())));
        assert_eq!(get_rule(coffee.id, &connection), Ok(coffee));
        assert_eq!(rule_group_exists("Food", &connection), Ok(true));
    }

    #[test]
    fn rename_missing_group_fails() {
        let connection = get_test_connection();

        let result = rename_rule_group("Food", "Dining", &connection);

        assert_eq!(result, Err(Error::UpdateMissingRuleGroup));
    }

    #[test]
    fn delete_detaches_rules() {
        let connection = get_test_connection();
        create_rule_group("Food", &connection).unwrap();
        let coffee = create_rule(&rule_request("Coffee", Some("Food")), &connection).unwrap();

        delete_rule_group("Food", &connection).unwrap();

        assert_eq!(rule_group_exists("Food", &connection), Ok(false));
        assert_eq!(get_rule(coffee.id, &connection).unwrap().rule_group_name, None);
    }

    #[test]
    fn delete_missing_group_fails() {
        let connection = get_test_connection();

        assert_eq!(
            delete_rule_group("Food", &connection),
            Err(Error::DeleteMissingRuleGroup)
        );
    }
}
