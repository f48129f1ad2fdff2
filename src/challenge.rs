//! Gamified challenges: the data model, database queries and the progress
//! update endpoint.
//!
//! Challenges do not track anything themselves. Their progress is mutated
//! from the outside (0–100); reaching 100 marks the challenge completed.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, endpoints,
    html::{CARD_STYLE, render},
};

/// The ID of a challenge in the application database.
pub type ChallengeId = i64;

/// A savings challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// The ID of the challenge.
    pub id: ChallengeId,
    /// The name of the challenge.
    pub title: String,
    /// What the user has to do to complete the challenge.
    pub description: String,
    /// How far along the challenge is, from 0 to 100.
    pub progress: i64,
    /// A short description of the finish line, e.g. "R$ 100 economizados".
    pub target: String,
    /// Whether the challenge has been completed.
    pub is_completed: bool,
    /// The reward for completing the challenge, e.g. "+50 pts".
    pub reward: String,
}

/// The data needed to create a challenge. Only used by the demo seed; the
/// app itself does not create challenges.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    /// The name of the challenge.
    pub title: String,
    /// What the user has to do to complete the challenge.
    pub description: String,
    /// How far along the challenge is, from 0 to 100.
    pub progress: i64,
    /// A short description of the finish line.
    pub target: String,
    /// Whether the challenge has been completed.
    pub is_completed: bool,
    /// The reward for completing the challenge.
    pub reward: String,
}

fn map_challenge_row(row: &Row) -> Result<Challenge, rusqlite::Error> {
    Ok(Challenge {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        progress: row.get(3)?,
        target: row.get(4)?,
        is_completed: row.get(5)?,
        reward: row.get(6)?,
    })
}

/// Create the challenge table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_challenge_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS challenge (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                target TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                reward TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert a challenge into the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn create_challenge(
    new_challenge: NewChallenge,
    connection: &Connection,
) -> Result<Challenge, Error> {
    let challenge = connection
        .prepare(
            "INSERT INTO challenge (title, description, progress, target, is_completed, reward)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, title, description, progress, target, is_completed, reward",
        )?
        .query_row(
            (
                &new_challenge.title,
                &new_challenge.description,
                new_challenge.progress,
                &new_challenge.target,
                new_challenge.is_completed,
                &new_challenge.reward,
            ),
            map_challenge_row,
        )?;

    Ok(challenge)
}

/// Retrieve all challenges in the database, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_challenges(connection: &Connection) -> Result<Vec<Challenge>, Error> {
    connection
        .prepare(
            "SELECT id, title, description, progress, target, is_completed, reward
             FROM challenge ORDER BY id ASC",
        )?
        .query_map([], map_challenge_row)?
        .map(|challenge_result| challenge_result.map_err(Error::SqlError))
        .collect()
}

/// Set the progress of the challenge with `challenge_id`.
///
/// `progress` is clamped to 0–100. A progress of 100 marks the challenge as
/// completed; anything lower clears the completed flag.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingChallenge] if `challenge_id` does not refer to a challenge,
/// - [Error::SqlError] if there is some other SQL error.
pub fn set_challenge_progress(
    challenge_id: ChallengeId,
    progress: i64,
    connection: &Connection,
) -> Result<Challenge, Error> {
    let progress = progress.clamp(0, 100);
    let is_completed = progress == 100;

    connection
        .prepare(
            "UPDATE challenge SET progress = ?1, is_completed = ?2
             WHERE id = ?3
             RETURNING id, title, description, progress, target, is_completed, reward",
        )?
        .query_row((progress, is_completed, challenge_id), map_challenge_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingChallenge,
            error => error.into(),
        })
}

fn challenge_card(challenge: &Challenge) -> Markup {
    html! {
        div class={ (CARD_STYLE) " challenge-card-target" }
        {
            div class="flex items-center justify-between mb-2"
            {
                h3 class="text-lg font-semibold" { (challenge.title) }

                @if challenge.is_completed {
                    span class="text-sm font-semibold text-green-600 dark:text-green-400" { "Completed" }
                } @else {
                    span class="text-sm text-gray-500 dark:text-gray-400" { (challenge.target) }
                }
            }

            p class="text-sm text-gray-500 dark:text-gray-400 mb-2" { (challenge.description) }

            div class="w-full bg-gray-200 rounded-full h-2.5 dark:bg-gray-700 mb-2"
            {
                div
                    class="bg-green-500 h-2.5 rounded-full"
                    style={ "width: " (challenge.progress) "%" }
                {}
            }

            div class="flex items-center justify-between"
            {
                span class="text-sm" { (challenge.progress) "%" }
                span class="text-sm font-semibold text-amber-600 dark:text-amber-400" { (challenge.reward) }
            }

            form
                hx-post=(endpoints::format_endpoint(endpoints::CHALLENGE_PROGRESS, challenge.id))
                hx-target="closest div.challenge-card-target"
                hx-swap="outerHTML"
                class="flex gap-2 mt-3"
            {
                input
                    type="number"
                    name="progress"
                    min="0"
                    max="100"
                    value=(challenge.progress)
                    class="block w-24 p-1.5 rounded text-sm text-gray-900 dark:text-white \
                        bg-gray-50 dark:bg-gray-700 border border-gray-300 dark:border-gray-600"
                    required;

                button
                    type="submit"
                    class="px-3 py-1.5 text-sm bg-blue-500 dark:bg-blue-600 text-white rounded"
                {
                    "Update"
                }
            }
        }
    }
}

/// The challenges section shown on the goals page.
pub fn challenges_section(challenges: &[Challenge]) -> Markup {
    html! {
        section id="challenges"
        {
            h2 class="text-2xl font-bold mb-4" { "Challenges" }

            div class="grid grid-cols-1 md:grid-cols-2 gap-4"
            {
                @for challenge in challenges {
                    (challenge_card(challenge))
                }
            }
        }
    }
}

/// The state needed to update challenge progress.
#[derive(Debug, Clone)]
pub struct ChallengeState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChallengeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for a challenge progress update.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    /// The new progress, clamped to 0–100.
    pub progress: i64,
}

/// Handler for updating a challenge's progress via the POST method.
///
/// On success the updated challenge card is returned so HTMX can swap it in
/// place. Otherwise an alert fragment describing the problem is returned.
pub async fn set_progress_endpoint(
    State(state): State<ChallengeState>,
    Path(challenge_id): Path<ChallengeId>,
    Form(progress_data): Form<ProgressData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    match set_challenge_progress(challenge_id, progress_data.progress, &connection) {
        Ok(challenge) => render(StatusCode::OK, challenge_card(&challenge)),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
pub(crate) mod test_challenges {
    use super::NewChallenge;

    /// A valid in-progress challenge for tests.
    pub(crate) fn new_test_challenge() -> NewChallenge {
        NewChallenge {
            title: "Delivery Detox".to_string(),
            description: "Gaste R$100 a menos em delivery esta semana".to_string(),
            progress: 80,
            target: "R$ 100 economizados".to_string(),
            is_completed: false,
            reward: "+50 pts".to_string(),
        }
    }
}

#[cfg(test)]
mod challenge_tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{
        create_challenge, create_challenge_table, get_challenges, set_challenge_progress,
        test_challenges::new_test_challenge,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_challenge_table(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_list_challenges() {
        let conn = get_test_connection();

        let challenge = create_challenge(new_test_challenge(), &conn).unwrap();

        assert!(challenge.id > 0);
        assert_eq!(get_challenges(&conn).unwrap(), vec![challenge]);
    }

    #[test]
    fn set_progress_updates_challenge() {
        let conn = get_test_connection();
        let challenge = create_challenge(new_test_challenge(), &conn).unwrap();

        let updated = set_challenge_progress(challenge.id, 90, &conn).unwrap();

        assert_eq!(updated.progress, 90);
        assert!(!updated.is_completed);
    }

    #[test]
    fn progress_of_100_completes_challenge() {
        let conn = get_test_connection();
        let challenge = create_challenge(new_test_challenge(), &conn).unwrap();

        let updated = set_challenge_progress(challenge.id, 100, &conn).unwrap();

        assert_eq!(updated.progress, 100);
        assert!(updated.is_completed);
    }

    #[test]
    fn progress_is_clamped_to_valid_range() {
        let conn = get_test_connection();
        let challenge = create_challenge(new_test_challenge(), &conn).unwrap();

        let updated = set_challenge_progress(challenge.id, 150, &conn).unwrap();
        assert_eq!(updated.progress, 100);
        assert!(updated.is_completed);

        let updated = set_challenge_progress(challenge.id, -10, &conn).unwrap();
        assert_eq!(updated.progress, 0);
        assert!(!updated.is_completed);
    }

    #[test]
    fn lowering_progress_clears_completed_flag() {
        let conn = get_test_connection();
        let challenge = create_challenge(new_test_challenge(), &conn).unwrap();
        set_challenge_progress(challenge.id, 100, &conn).unwrap();

        let updated = set_challenge_progress(challenge.id, 50, &conn).unwrap();

        assert!(!updated.is_completed);
    }

    #[test]
    fn updating_missing_challenge_fails() {
        let conn = get_test_connection();

        let result = set_challenge_progress(42, 50, &conn);

        assert_eq!(result, Err(Error::UpdateMissingChallenge));
    }
}
