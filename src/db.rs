//! Database initialization: table creation and the first-use demo seed.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, challenge::create_challenge_table, goal::create_goal_table, seed::apply_demo_seed,
    session::create_session_table, split_group::create_split_group_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the application's tables and seed any empty collection with the
/// demo data.
///
/// Everything runs inside a single exclusive transaction, so a failed
/// start-up leaves the database untouched.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_challenge_table(&transaction)?;
    create_split_group_table(&transaction)?;

    apply_demo_seed(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                ('user', 'session', 'transaction', 'goal', 'challenge', 'split_group')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 6);
    }

    #[test]
    fn initialize_twice_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }
}
