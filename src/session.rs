//! The active-session slot.
//!
//! At most one user is logged in at a time. The session lives in its own
//! singleton table, independent of the user table: logging in replaces the
//! row, logging out deletes it.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{Error, user::UserID};

/// The active session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The ID of the logged-in user.
    pub user_id: UserID,
    /// When the session was started.
    pub started_at: OffsetDateTime,
}

/// Create the session table.
///
/// The `CHECK (id = 1)` constraint keeps the table a singleton.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                user_id INTEGER NOT NULL,
                started_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Start a session for `user_id`, replacing any previous session.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn start_session(user_id: UserID, connection: &Connection) -> Result<Session, Error> {
    let started_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT OR REPLACE INTO session (id, user_id, started_at) VALUES (1, ?1, ?2)",
        (user_id.as_i64(), started_at),
    )?;

    Ok(Session {
        user_id,
        started_at,
    })
}

/// End the active session, if any.
///
/// Ending an already-ended session is not an error.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn end_session(connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM session WHERE id = 1", ())?;

    Ok(())
}

/// Get the active session.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user is logged in, or [Error::SqlError]
/// if an SQL related error occurred.
pub fn get_active_session(connection: &Connection) -> Result<Session, Error> {
    connection
        .prepare("SELECT user_id, started_at FROM session WHERE id = 1")?
        .query_row([], |row| {
            Ok(Session {
                user_id: UserID::new(row.get(0)?),
                started_at: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

#[cfg(test)]
mod session_tests {
    use rusqlite::Connection;

    use crate::{Error, user::UserID};

    use super::{create_session_table, end_session, get_active_session, start_session};

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_session_table(&conn).expect("Could not create session table");

        conn
    }

    #[test]
    fn no_session_by_default() {
        let conn = get_db_connection();

        let result = get_active_session(&conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn start_session_sets_active_session() {
        let conn = get_db_connection();

        let session = start_session(UserID::new(1), &conn).unwrap();

        // The timestamp loses sub-second precision in storage, so compare
        // the user rather than the whole session.
        let active = get_active_session(&conn).unwrap();
        assert_eq!(active.user_id, session.user_id);
    }

    #[test]
    fn start_session_replaces_previous_session() {
        let conn = get_db_connection();
        start_session(UserID::new(1), &conn).unwrap();

        start_session(UserID::new(2), &conn).unwrap();

        let active = get_active_session(&conn).unwrap();
        assert_eq!(active.user_id, UserID::new(2));

        let session_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM session", [], |row| row.get(0))
            .unwrap();
        assert_eq!(session_count, 1, "want a single session row");
    }

    #[test]
    fn end_session_clears_active_session() {
        let conn = get_db_connection();
        start_session(UserID::new(1), &conn).unwrap();

        end_session(&conn).unwrap();

        assert_eq!(get_active_session(&conn), Err(Error::NotFound));
    }

    #[test]
    fn end_session_without_active_session_is_ok() {
        let conn = get_db_connection();

        assert!(end_session(&conn).is_ok());
    }
}
