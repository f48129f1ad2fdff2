//! Savings goals: the data model, database queries, the goals page and the
//! endpoints for creating goals and depositing into them.
//!
//! Goal progress is monotonic: deposits are non-negative and the saved
//! amount is capped at the target amount.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    challenge::{challenges_section, get_challenges},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, format_currency, render, text_input,
    },
    navigation::NavBar,
};

/// The ID of a goal in the application database.
pub type GoalId = i64;

/// The icon displayed on a goal card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalIcon {
    /// A mobile phone.
    Phone,
    /// An aeroplane, for travel goals.
    Plane,
    /// A shield, for emergency funds.
    Shield,
    /// A car.
    Car,
    /// A house.
    Home,
    /// A star, the catch-all icon.
    Star,
}

impl GoalIcon {
    /// The icon as the lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalIcon::Phone => "phone",
            GoalIcon::Plane => "plane",
            GoalIcon::Shield => "shield",
            GoalIcon::Car => "car",
            GoalIcon::Home => "home",
            GoalIcon::Star => "star",
        }
    }

    /// The emoji shown on the goal card.
    fn emoji(&self) -> &'static str {
        match self {
            GoalIcon::Phone => "📱",
            GoalIcon::Plane => "✈️",
            GoalIcon::Shield => "🛡️",
            GoalIcon::Car => "🚗",
            GoalIcon::Home => "🏠",
            GoalIcon::Star => "⭐",
        }
    }
}

impl Display for GoalIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for GoalIcon {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GoalIcon {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "phone" => Ok(GoalIcon::Phone),
            "plane" => Ok(GoalIcon::Plane),
            "shield" => Ok(GoalIcon::Shield),
            "car" => Ok(GoalIcon::Car),
            "home" => Ok(GoalIcon::Home),
            "star" => Ok(GoalIcon::Star),
            other => Err(FromSqlError::Other(
                format!("invalid goal icon \"{other}\"").into(),
            )),
        }
    }
}

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// What the user is saving for.
    pub title: String,
    /// The amount the user wants to save.
    pub target_amount: f64,
    /// The amount saved so far. Never exceeds `target_amount`.
    pub current_amount: f64,
    /// When the user wants to reach the goal, if they set a date.
    pub deadline: Option<Date>,
    /// The icon displayed on the goal card.
    pub icon: GoalIcon,
    /// The background colour class for the goal card icon.
    pub color: String,
}

impl Goal {
    /// The saved amount as a percentage of the target, clamped to 100.
    pub fn percent_complete(&self) -> i64 {
        if self.target_amount <= 0.0 {
            return 100;
        }

        ((self.current_amount / self.target_amount) * 100.0).round() as i64
    }
}

/// The data needed to create a new goal.
#[derive(Debug, Clone)]
pub struct NewGoal {
    /// What the user is saving for.
    pub title: String,
    /// The amount the user wants to save.
    pub target_amount: f64,
    /// The amount already saved.
    pub current_amount: f64,
    /// When the user wants to reach the goal.
    pub deadline: Option<Date>,
    /// The icon displayed on the goal card.
    pub icon: GoalIcon,
    /// The background colour class for the goal card icon.
    pub color: String,
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        title: row.get(1)?,
        target_amount: row.get(2)?,
        current_amount: row.get(3)?,
        deadline: row.get(4)?,
        icon: row.get(5)?,
        color: row.get(6)?,
    })
}

/// Create the goal table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                target_amount REAL NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                deadline TEXT,
                icon TEXT NOT NULL,
                color TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create a new goal in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyGoalTitle] if the title is blank,
/// - [Error::InvalidAmount] if the target amount is zero or negative,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_goal(new_goal: NewGoal, connection: &Connection) -> Result<Goal, Error> {
    if new_goal.title.trim().is_empty() {
        return Err(Error::EmptyGoalTitle);
    }

    if new_goal.target_amount <= 0.0 {
        return Err(Error::InvalidAmount(new_goal.target_amount));
    }

    // A head start larger than the target is capped, same as deposits.
    let current_amount = new_goal.current_amount.min(new_goal.target_amount);

    let goal = connection
        .prepare(
            "INSERT INTO goal (title, target_amount, current_amount, deadline, icon, color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, title, target_amount, current_amount, deadline, icon, color",
        )?
        .query_row(
            (
                &new_goal.title,
                new_goal.target_amount,
                current_amount,
                new_goal.deadline,
                new_goal.icon,
                &new_goal.color,
            ),
            map_goal_row,
        )?;

    Ok(goal)
}

/// Retrieve all goals in the database, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_goals(connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(
            "SELECT id, title, target_amount, current_amount, deadline, icon, color
             FROM goal ORDER BY id ASC",
        )?
        .query_map([], map_goal_row)?
        .map(|goal_result| goal_result.map_err(Error::SqlError))
        .collect()
}

/// Add `amount` to the saved amount of the goal with `goal_id`.
///
/// The saved amount is capped at the goal's target amount, so depositing
/// more than the amount remaining simply completes the goal.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeDeposit] if `amount` is negative,
/// - [Error::DepositMissingGoal] if `goal_id` does not refer to a goal,
/// - [Error::SqlError] if there is some other SQL error.
pub fn deposit_into_goal(
    goal_id: GoalId,
    amount: f64,
    connection: &Connection,
) -> Result<Goal, Error> {
    if amount < 0.0 {
        return Err(Error::NegativeDeposit(amount));
    }

    connection
        .prepare(
            "UPDATE goal SET current_amount = MIN(target_amount, current_amount + ?1)
             WHERE id = ?2
             RETURNING id, title, target_amount, current_amount, deadline, icon, color",
        )?
        .query_row((amount, goal_id), map_goal_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DepositMissingGoal,
            error => error.into(),
        })
}

/// The state needed to serve the goals page and its endpoints.
#[derive(Debug, Clone)]
pub struct GoalsState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn goal_card(goal: &Goal) -> Markup {
    let percent = goal.percent_complete();

    html! {
        div class=(CARD_STYLE)
        {
            div class="flex items-center gap-3 mb-3"
            {
                span class={ "text-2xl p-2 rounded-lg " (goal.color) } { (goal.icon.emoji()) }

                div
                {
                    h3 class="text-lg font-semibold" { (goal.title) }

                    @match goal.deadline {
                        Some(deadline) => {
                            p class="text-sm text-gray-500 dark:text-gray-400" { "Until " (deadline.to_string()) }
                        }
                        None => {
                            p class="text-sm text-gray-500 dark:text-gray-400" { "No deadline" }
                        }
                    }
                }
            }

            div class="w-full bg-gray-200 rounded-full h-2.5 dark:bg-gray-700 mb-2"
            {
                div
                    class="bg-blue-600 h-2.5 rounded-full"
                    style={ "width: " (percent) "%" }
                {}
            }

            p class="text-sm mb-3"
            {
                (format_currency(goal.current_amount))
                " of "
                (format_currency(goal.target_amount))
                " (" (percent) "%)"
            }

            form
                hx-post=(endpoints::format_endpoint(endpoints::GOAL_DEPOSIT, goal.id))
                hx-target="closest div.goal-card-target"
                hx-swap="outerHTML"
                class="flex gap-2"
            {
                input
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0"
                    placeholder="Deposit amount"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Deposit" }
            }
        }
    }
}

/// A goal card wrapped in the HTMX swap target used by the deposit endpoint.
fn goal_card_target(goal: &Goal) -> Markup {
    html! {
        div class="goal-card-target" { (goal_card(goal)) }
    }
}

fn new_goal_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::GOALS_API)
            hx-target="#new-goal-error"
            class="space-y-4"
        {
            (text_input("text", "title", "Title", "", None))
            (text_input("number", "target_amount", "Target amount", "", None))

            div
            {
                label for="deadline" class=(FORM_LABEL_STYLE) { "Deadline (optional)" }
                input type="date" name="deadline" id="deadline" class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="icon" class=(FORM_LABEL_STYLE) { "Icon" }

                select name="icon" id="icon" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="star" { "Star" }
                    option value="phone" { "Phone" }
                    option value="plane" { "Plane" }
                    option value="shield" { "Shield" }
                    option value="car" { "Car" }
                    option value="home" { "Home" }
                }
            }

            input type="hidden" name="color" value="bg-blue-500";

            div id="new-goal-error" {}

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create goal" }
        }
    }
}

/// Display the goals page: savings goals plus the gamified challenges.
pub async fn get_goals_page(State(state): State<GoalsState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let goals = match get_goals(&connection) {
        Ok(goals) => goals,
        Err(error) => return error.into_response(),
    };

    let challenges = match get_challenges(&connection) {
        Ok(challenges) => challenges,
        Err(error) => return error.into_response(),
    };

    let content = html! {
        (NavBar::new(endpoints::GOALS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg"
            {
                h2 class="text-2xl font-bold mb-4" { "Savings Goals" }

                div class="grid grid-cols-1 md:grid-cols-2 gap-4 mb-8"
                {
                    @for goal in &goals {
                        (goal_card_target(goal))
                    }
                }

                div class="max-w-md mb-8"
                {
                    h3 class="text-lg font-semibold mb-2" { "New goal" }
                    (new_goal_form())
                }

                (challenges_section(&challenges))
            }
        }
    };

    base("Goals", &[], &content).into_response()
}

/// Date format used by HTML date inputs, e.g. "2024-12-25".
const FORM_DATE_FORMAT: &[time::format_description::BorrowedFormatItem] =
    time::macros::format_description!("[year]-[month]-[day]");

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(date_string) => Date::parse(date_string, FORM_DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// The form data for creating a goal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGoalData {
    /// What the user is saving for.
    pub title: String,
    /// The amount the user wants to save.
    pub target_amount: f64,
    /// When the user wants to reach the goal. An empty string means no
    /// deadline.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub deadline: Option<Date>,
    /// The icon displayed on the goal card.
    pub icon: GoalIcon,
    /// The background colour class for the goal card icon.
    pub color: String,
}

/// Handler for creating a goal via the POST method.
///
/// On success the client is redirected to the goals page. Otherwise an
/// alert fragment describing the problem is returned.
pub async fn create_goal_endpoint(
    State(state): State<GoalsState>,
    Form(new_goal_data): Form<NewGoalData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let new_goal = NewGoal {
        title: new_goal_data.title,
        target_amount: new_goal_data.target_amount,
        current_amount: 0.0,
        deadline: new_goal_data.deadline,
        icon: new_goal_data.icon,
        color: new_goal_data.color,
    };

    match create_goal(new_goal, &connection) {
        Ok(goal) => {
            tracing::info!("Created goal \"{}\" ({})", goal.title, goal.id);
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::GOALS_VIEW.to_owned()),
                (),
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// The form data for a goal deposit.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositData {
    /// The amount to add to the goal's saved amount.
    pub amount: f64,
}

/// Handler for depositing into a goal via the POST method.
///
/// On success the updated goal card is returned so HTMX can swap it in
/// place. Otherwise an alert fragment describing the problem is returned.
pub async fn deposit_endpoint(
    State(state): State<GoalsState>,
    Path(goal_id): Path<GoalId>,
    Form(deposit_data): Form<DepositData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    match deposit_into_goal(goal_id, deposit_data.amount, &connection) {
        Ok(goal) => render(StatusCode::OK, goal_card_target(&goal)),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
pub(crate) mod test_goals {
    use super::{GoalIcon, NewGoal};

    /// A valid goal for tests that need some goal.
    pub(crate) fn new_test_goal() -> NewGoal {
        NewGoal {
            title: "Viagem Europa".to_string(),
            target_amount: 15000.0,
            current_amount: 2100.0,
            deadline: None,
            icon: GoalIcon::Plane,
            color: "bg-sky-500".to_string(),
        }
    }
}


#[cfg(test)]
mod goals_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::challenge::create_challenge_table;

    use super::{GoalsState, create_goal, create_goal_table, get_goals_page, test_goals::new_test_goal};

    fn get_test_state() -> GoalsState {
        let conn = Connection::open_in_memory().unwrap();
        create_goal_table(&conn).unwrap();
        create_challenge_table(&conn).unwrap();
        create_goal(new_test_goal(), &conn).unwrap();

        GoalsState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn goals_page_lists_goals() {
        let state = get_test_state();

        let response = get_goals_page(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("Viagem Europa"));
        assert!(text.contains("Savings Goals"));
    }
}
