use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use ledger_rules::{
    Action, Condition, RuleRequest, Transaction, TransactionField, TransactionType, Trigger,
    create_account, create_rule, create_rule_group, create_transaction, initialize_db,
};

/// A utility for creating a test database for the JSON API server of ledger_rules.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating accounts...");
    let everyday = create_account("Everyday", &conn)?;
    let savings = create_account("Savings", &conn)?;

    println!("Creating transactions...");
    let today = OffsetDateTime::now_utc().date();
    let transactions = [
        ("COFFEE SHOP", "-4.50", TransactionType::Expense),
        ("COFFEE BEANS ONLINE", "-24.00", TransactionType::Expense),
        ("SUPERMARKET", "-87.12", TransactionType::Expense),
        ("RENT", "-450.00", TransactionType::Expense),
        ("SALARY", "2500.00", TransactionType::Income),
        ("TRANSFER TO SAVINGS", "-200.00", TransactionType::Transfer),
    ];

    for days_ago in 0..30 {
        let date = today - Duration::days(days_ago);
        let (description, amount, transaction_type) =
            transactions[days_ago as usize % transactions.len()];

        create_transaction(
            Transaction::build(amount.parse::<Decimal>()?, date, description)
                .transaction_type(transaction_type)
                .source_account_id(Some(everyday.id)),
            &conn,
        )?;
    }

    println!("Creating rules...");
    create_rule_group("Spending", &conn)?;

    create_rule(
        &RuleRequest {
            name: "Coffee".to_owned(),
            is_strict: true,
            triggers: vec![Trigger::new(
                TransactionField::Description,
                Condition::StartsWith,
                Some("COFFEE"),
            )],
            actions: vec![Action::set(TransactionField::Category, "Dining")],
            rule_group_name: Some("Spending".to_owned()),
        },
        &conn,
    )?;

    create_rule(
        &RuleRequest {
            name: "Groceries".to_owned(),
            is_strict: false,
            triggers: vec![
                Trigger::new(
                    TransactionField::Description,
                    Condition::Contains,
                    Some("SUPERMARKET"),
                ),
                Trigger::new(TransactionField::Description, Condition::Contains, Some("BEANS")),
            ],
            actions: vec![Action::set(TransactionField::Category, "Groceries")],
            rule_group_name: Some("Spending".to_owned()),
        },
        &conn,
    )?;

    create_rule(
        &RuleRequest {
            name: "Savings transfers".to_owned(),
            is_strict: true,
            triggers: vec![Trigger::new(
                TransactionField::Type,
                Condition::IsExactly,
                Some("Transfer"),
            )],
            actions: vec![Action::set(
                TransactionField::Destination,
                &savings.id.to_string(),
            )],
            rule_group_name: None,
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
