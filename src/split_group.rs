//! Split groups: shared expenses with friends, with precomputed net totals.
//!
//! Split groups are read-only in this app: they are seeded with demo data,
//! listed on the split page, and never mutated.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, endpoints,
    html::{CARD_STYLE, PAGE_CONTAINER_STYLE, base, format_currency},
    navigation::NavBar,
};

/// The ID of a split group in the application database.
pub type SplitGroupId = i64;

/// A group of people splitting shared expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitGroup {
    /// The ID of the split group.
    pub id: SplitGroupId,
    /// The name of the group, e.g. "Viagem Florianópolis".
    pub name: String,
    /// The net amount other members owe you.
    pub total_owed_to_you: f64,
    /// The net amount you owe other members.
    pub total_you_owe: f64,
    /// The names of the group members.
    pub members: Vec<String>,
}

/// The data needed to insert a split group. Only used by the demo seed.
#[derive(Debug, Clone)]
pub struct NewSplitGroup {
    /// The name of the group.
    pub name: String,
    /// The net amount other members owe you.
    pub total_owed_to_you: f64,
    /// The net amount you owe other members.
    pub total_you_owe: f64,
    /// The names of the group members.
    pub members: Vec<String>,
}

fn map_split_group_row(row: &Row) -> Result<SplitGroup, rusqlite::Error> {
    let raw_members: String = row.get(4)?;

    // Members are stored as a JSON array of names.
    let members = serde_json::from_str(&raw_members).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(SplitGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        total_owed_to_you: row.get(2)?,
        total_you_owe: row.get(3)?,
        members,
    })
}

/// Create the split group table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_split_group_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS split_group (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                total_owed_to_you REAL NOT NULL DEFAULT 0,
                total_you_owe REAL NOT NULL DEFAULT 0,
                members TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert a split group into the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_split_group(
    new_split_group: NewSplitGroup,
    connection: &Connection,
) -> Result<SplitGroup, Error> {
    let members_json = serde_json::to_string(&new_split_group.members)
        .expect("a list of strings always serializes");

    let split_group = connection
        .prepare(
            "INSERT INTO split_group (name, total_owed_to_you, total_you_owe, members)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, total_owed_to_you, total_you_owe, members",
        )?
        .query_row(
            (
                &new_split_group.name,
                new_split_group.total_owed_to_you,
                new_split_group.total_you_owe,
                members_json,
            ),
            map_split_group_row,
        )?;

    Ok(split_group)
}

/// Retrieve all split groups in the database, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_split_groups(connection: &Connection) -> Result<Vec<SplitGroup>, Error> {
    connection
        .prepare(
            "SELECT id, name, total_owed_to_you, total_you_owe, members
             FROM split_group ORDER BY id ASC",
        )?
        .query_map([], map_split_group_row)?
        .map(|split_group_result| split_group_result.map_err(Error::SqlError))
        .collect()
}

/// The state needed to serve the split page.
#[derive(Debug, Clone)]
pub struct SplitPageState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SplitPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn split_group_card(split_group: &SplitGroup) -> Markup {
    html! {
        div id={ "split-group-" (split_group.id) } class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-1" { (split_group.name) }

            p class="text-sm text-gray-500 dark:text-gray-400 mb-3"
            {
                (split_group.members.join(", "))
            }

            div class="flex justify-between"
            {
                div
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { "Owed to you" }
                    p class="font-semibold text-green-600 dark:text-green-400"
                    {
                        (format_currency(split_group.total_owed_to_you))
                    }
                }

                div class="text-right"
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { "You owe" }
                    p class="font-semibold text-red-600 dark:text-red-400"
                    {
                        (format_currency(split_group.total_you_owe))
                    }
                }
            }
        }
    }
}

/// Display the split page: each group's members and net totals.
pub async fn get_split_page(State(state): State<SplitPageState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let split_groups = match get_split_groups(&connection) {
        Ok(split_groups) => split_groups,
        Err(error) => return error.into_response(),
    };

    let content = html! {
        (NavBar::new(endpoints::SPLIT_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg"
            {
                h2 class="text-2xl font-bold mb-4" { "Split Groups" }

                div class="grid grid-cols-1 md:grid-cols-2 gap-4"
                {
                    @for split_group in &split_groups {
                        (split_group_card(split_group))
                    }
                }
            }
        }
    };

    base("Split", &[], &content).into_response()
}
