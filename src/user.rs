//! Code for creating the user table and fetching users from the database.
//!
//! Emails and CPFs are unique across users. Uniqueness is enforced by the
//! database schema and surfaced as [Error::DuplicateEmail] and
//! [Error::DuplicateCpf].

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A CPF, the Brazilian natural-person registry number.
///
/// Stored as its eleven digits with any punctuation stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpf(String);

impl Cpf {
    /// Parse a CPF from a string, accepting the common punctuated form
    /// ("123.456.789-09") as well as bare digits.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCpf] if the string does not contain exactly
    /// eleven digits.
    pub fn new(raw_cpf: &str) -> Result<Self, Error> {
        let digits: String = raw_cpf.chars().filter(char::is_ascii_digit).collect();

        if digits.len() != 11 {
            return Err(Error::InvalidCpf(raw_cpf.to_string()));
        }

        Ok(Self(digits))
    }

    /// Create a CPF without validation, e.g. from a value read back from the
    /// user table.
    pub fn new_unchecked(digits: &str) -> Self {
        Self(digits.to_string())
    }

    /// The CPF as a string of eleven digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's email address, unique across users.
    pub email: EmailAddress,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's CPF, unique across users.
    pub cpf: Cpf,
    /// The user's date of birth.
    pub birth_date: Date,
}

/// The data needed to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: EmailAddress,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's CPF.
    pub cpf: Cpf,
    /// The user's date of birth.
    pub birth_date: Date,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                cpf TEXT NOT NULL UNIQUE,
                birth_date TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::DuplicateCpf] if the CPF is already registered,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (name, email, password, cpf, birth_date) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &new_user.name,
            new_user.email.as_str(),
            new_user.password_hash.to_string(),
            new_user.cpf.as_str(),
            new_user.birth_date,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: new_user.name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        cpf: new_user.cpf,
        birth_date: new_user.birth_date,
    })
}

fn map_user_row(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let name: String = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;
    let raw_cpf: String = row.get(4)?;
    let birth_date: Date = row.get(5)?;

    // The row was validated on insert, so parse failures here mean the
    // database was edited from outside the application.
    let email = EmailAddress::from_str(&raw_email).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    Ok(User {
        id: UserID::new(raw_id),
        name,
        email,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        cpf: Cpf::new_unchecked(&raw_cpf),
        birth_date,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, email, password, cpf, birth_date FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email equal to `email`.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, email, password, cpf, birth_date FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get::<_, i64>(0).map(|count| count as usize)
        })
        .map_err(|error| error.into())
}

/// Replace the password hash of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered
/// user, or [Error::SqlError] if an SQL related error occurred.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_changed = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.to_string(), user_id.as_i64()),
    )?;

    if rows_changed == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}


#[cfg(test)]
mod cpf_tests {
    use crate::Error;

    use super::Cpf;

    #[test]
    fn new_accepts_punctuated_form() {
        let cpf = Cpf::new("529.982.247-25").unwrap();

        assert_eq!(cpf.as_str(), "52998224725");
    }

    #[test]
    fn new_accepts_bare_digits() {
        let cpf = Cpf::new("52998224725").unwrap();

        assert_eq!(cpf.as_str(), "52998224725");
    }

    #[test]
    fn new_rejects_wrong_length() {
        let result = Cpf::new("1234567890");

        assert_eq!(result, Err(Error::InvalidCpf("1234567890".to_string())));
    }

    #[test]
    fn new_rejects_letters() {
        let result = Cpf::new("not a cpf");

        assert!(matches!(result, Err(Error::InvalidCpf(_))));
    }
}

#[cfg(test)]
mod user_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{Error, PasswordHash};

    use super::{
        Cpf, NewUser, count_users, create_user, create_user_table, get_user_by_email,
        get_user_by_id, test_user::new_test_user, update_password,
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();

        let inserted_user = create_user(new_test_user(), &conn).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.name, "Ana Souza");
        assert_eq!(inserted_user.email.as_str(), "ana@example.com");
    }

    #[test]
    fn insert_user_fails_with_duplicate_email() {
        let conn = get_db_connection();
        create_user(new_test_user(), &conn).unwrap();

        let mut duplicate = new_test_user();
        // A different CPF so that only the email collides.
        duplicate.cpf = Cpf::new_unchecked("16899535009");
        let result = create_user(duplicate, &conn);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn insert_user_fails_with_duplicate_cpf() {
        let conn = get_db_connection();
        create_user(new_test_user(), &conn).unwrap();

        let mut duplicate = new_test_user();
        duplicate.email = EmailAddress::from_str("other@example.com").unwrap();
        let result = create_user(duplicate, &conn);

        assert_eq!(result, Err(Error::DuplicateCpf));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_db_connection();

        let result = get_user_by_id(super::UserID::new(42), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let conn = get_db_connection();
        let test_user = create_user(new_test_user(), &conn).unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_round_trips() {
        let conn = get_db_connection();
        let test_user = create_user(new_test_user(), &conn).unwrap();

        let retrieved_user = get_user_by_email("ana@example.com", &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
        assert_eq!(retrieved_user.birth_date, date!(1994 - 03 - 12));
    }

    #[test]
    fn get_user_by_email_fails_for_unknown_email() {
        let conn = get_db_connection();
        create_user(new_test_user(), &conn).unwrap();

        let result = get_user_by_email("nobody@example.com", &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_db_connection();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        create_user(new_test_user(), &conn).unwrap();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }

    #[test]
    fn update_password_replaces_hash() {
        let conn = get_db_connection();
        let test_user = create_user(new_test_user(), &conn).unwrap();
        let new_hash = PasswordHash::new_unchecked("a-different-hash");

        update_password(test_user.id, &new_hash, &conn).unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &conn).unwrap();
        assert_eq!(retrieved_user.password_hash, new_hash);
    }

    #[test]
    fn update_password_fails_for_unknown_user() {
        let conn = get_db_connection();
        let new_hash = PasswordHash::new_unchecked("a-different-hash");

        let result = update_password(super::UserID::new(42), &new_hash, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
