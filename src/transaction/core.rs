//! Defines the core data model and database queries for transactions.
//!
//! The transaction history is append-only: transactions can be created and
//! listed, but there is no edit or delete surface.

use std::fmt::Display;

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::Error;

/// The ID of a transaction in the application database.
pub type TransactionId = i64;

/// Whether a transaction brings money in or takes money out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in, e.g. salary or freelance work.
    Income,
    /// Money going out, e.g. groceries or rent.
    Expense,
}

impl TransactionKind {
    /// The kind as the lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(FromSqlError::Other(
                format!("invalid transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// An event where money was either spent or earned.
///
/// To create a new `Transaction`, use [create_transaction] with a
/// [NewTransaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned. Always positive; direction is
    /// carried by `kind`.
    pub amount: f64,
    /// The category of the transaction, e.g. "Alimentação", "Salário".
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// Whether the transaction was parsed from natural language by the AI
    /// assistant rather than entered through the form.
    pub ai_generated: bool,
}

/// The data needed to append a transaction to the history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// The category of the transaction.
    pub category: String,
    /// When the transaction happened. Must not be in the future.
    pub date: Date,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// Whether the transaction was parsed by the AI assistant.
    pub ai_generated: bool,
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        kind: row.get(5)?,
        ai_generated: row.get(6)?,
    })
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                kind TEXT NOT NULL,
                ai_generated INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    // Index used by the charts page, which groups by month and category.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;

    Ok(())
}

/// Append a new transaction to the history.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyDescription] if the description is blank,
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::FutureDate] if the date is later than today (UTC),
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.description.trim().is_empty() {
        return Err(Error::EmptyDescription);
    }

    if new_transaction.amount <= 0.0 {
        return Err(Error::InvalidAmount(new_transaction.amount));
    }

    if new_transaction.date > OffsetDateTime::now_utc().date() {
        return Err(Error::FutureDate(new_transaction.date));
    }

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (description, amount, category, date, kind, ai_generated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, description, amount, category, date, kind, ai_generated",
        )?
        .query_row(
            (
                &new_transaction.description,
                new_transaction.amount,
                &new_transaction.category,
                new_transaction.date,
                new_transaction.kind,
                new_transaction.ai_generated,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the full transaction history, newest first.
///
/// Transactions on the same date keep insertion order, newest first, so the
/// list reads top-down as "most recent activity".
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, description, amount, category, date, kind, ai_generated
             FROM \"transaction\" ORDER BY date DESC, id DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}


#[cfg(test)]
mod transaction_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::Error;

    use super::{
        NewTransaction, TransactionKind, count_transactions, create_transaction,
        create_transaction_table, get_transactions,
        test_transactions::{new_test_expense, new_test_income},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_transaction_table(&conn).unwrap();
        conn
    }

    #[test]
    fn create_transaction_succeeds() {
        let conn = get_test_connection();

        let transaction = create_transaction(new_test_expense(), &conn).unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.description, "Supermercado");
        assert_eq!(transaction.amount, 850.50);
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert!(!transaction.ai_generated);
    }

    #[test]
    fn create_transaction_keeps_ai_generated_flag() {
        let conn = get_test_connection();
        let new_transaction = NewTransaction {
            ai_generated: true,
            ..new_test_expense()
        };

        let transaction = create_transaction(new_transaction, &conn).unwrap();

        assert!(transaction.ai_generated);
    }

    #[test]
    fn create_transaction_fails_on_empty_description() {
        let conn = get_test_connection();
        let new_transaction = NewTransaction {
            description: "   ".to_string(),
            ..new_test_expense()
        };

        let result = create_transaction(new_transaction, &conn);

        assert_eq!(result, Err(Error::EmptyDescription));
    }

    #[test]
    fn create_transaction_fails_on_non_positive_amount() {
        let conn = get_test_connection();
        let new_transaction = NewTransaction {
            amount: -10.0,
            ..new_test_expense()
        };

        let result = create_transaction(new_transaction, &conn);

        assert_eq!(result, Err(Error::InvalidAmount(-10.0)));
    }

    #[test]
    fn create_transaction_fails_on_future_date() {
        let conn = get_test_connection();
        let tomorrow = OffsetDateTime::now_utc().date() + Duration::days(1);
        let new_transaction = NewTransaction {
            date: tomorrow,
            ..new_test_expense()
        };

        let result = create_transaction(new_transaction, &conn);

        assert_eq!(result, Err(Error::FutureDate(tomorrow)));
    }

    #[test]
    fn get_transactions_returns_newest_first() {
        let conn = get_test_connection();
        create_transaction(new_test_income(), &conn).unwrap();
        let newest = create_transaction(new_test_expense(), &conn).unwrap();

        let transactions = get_transactions(&conn).unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0], newest);
    }

    #[test]
    fn get_transactions_breaks_date_ties_by_insertion_order() {
        let conn = get_test_connection();
        create_transaction(new_test_expense(), &conn).unwrap();
        let second = create_transaction(new_test_expense(), &conn).unwrap();

        let transactions = get_transactions(&conn).unwrap();

        assert_eq!(transactions[0], second);
    }

    #[test]
    fn count_transactions_counts_inserted_rows() {
        let conn = get_test_connection();
        assert_eq!(count_transactions(&conn).unwrap(), 0);

        create_transaction(new_test_expense(), &conn).unwrap();
        create_transaction(new_test_income(), &conn).unwrap();

        assert_eq!(count_transactions(&conn).unwrap(), 2);
    }
}
