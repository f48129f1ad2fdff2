//! Cash Hub is a web app for tracking your personal finances: income and
//! expense transactions, savings goals, gamified challenges, split-group
//! balances, aggregate charts, and an AI assistant that answers questions
//! about your data.
//!
//! This library provides a REST API that directly serves HTML pages. All
//! durable state lives in a local SQLite database; the AI assistant is an
//! opaque hosted generative-language API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod alert;
mod app_state;
mod assistant;
mod auth;
mod challenge;
mod charts;
mod db;
mod endpoints;
mod forgot_password;
mod goal;
mod html;
mod internal_server_error;
mod log_in;
mod log_out;
mod logging;
mod navigation;
mod not_found;
mod password;
mod register_user;
mod routing;
mod seed;
mod session;
mod split_group;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use assistant::AssistantClient;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{
    Cpf, User, UserID, count_users, get_user_by_email, get_user_by_id, update_password,
};

use crate::{
    alert::AlertTemplate,
    html::render,
    internal_server_error::{InternalServerErrorPageTemplate, render_internal_server_error},
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid email/password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address is already registered to another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The CPF is already registered to another user.
    #[error("the CPF is already registered")]
    DuplicateCpf,

    /// The string could not be parsed as an email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The string could not be parsed as a CPF (eleven digits).
    #[error("\"{0}\" is not a valid CPF")]
    InvalidCpf(String),

    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A zero or negative amount was used to create a transaction or goal.
    ///
    /// Direction is carried by the transaction kind, so amounts are always
    /// positive.
    #[error("{0} is not a positive amount")]
    InvalidAmount(f64),

    /// An empty string was used where a description is required.
    #[error("the description cannot be empty")]
    EmptyDescription,

    /// An empty string was used to create a goal title.
    #[error("the goal title cannot be empty")]
    EmptyGoalTitle,

    /// A negative amount was used for a goal deposit.
    ///
    /// Goal progress is monotonic, deposits may not lower the saved amount.
    #[error("{0} is a negative deposit, which is not allowed")]
    NegativeDeposit(f64),

    /// Tried to deposit into a goal that does not exist.
    #[error("tried to deposit into a goal that is not in the database")]
    DepositMissingGoal,

    /// Tried to update a challenge that does not exist.
    #[error("tried to update a challenge that is not in the database")]
    UpdateMissingChallenge,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.cpf") =>
            {
                Error::DuplicateCpf
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => {
                render_internal_server_error(InternalServerErrorPageTemplate {
                    description: "Invalid Timezone Settings",
                    fix: &format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                })
            }
            Error::DatabaseLockError => render_internal_server_error(Default::default()),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error(Default::default())
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::DuplicateEmail => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Email already registered",
                    "This email address is already registered. Log in instead, \
                    or use a different email address.",
                ),
            ),
            Error::DuplicateCpf => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "CPF already registered",
                    "This CPF is already registered. Log in instead, or check \
                    the number for typos.",
                ),
            ),
            Error::InvalidEmail(email) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Invalid email address",
                    &format!("\"{email}\" is not a valid email address."),
                ),
            ),
            Error::InvalidCpf(cpf) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Invalid CPF",
                    &format!("\"{cpf}\" is not a valid CPF. A CPF has eleven digits."),
                ),
            ),
            Error::TooWeak(feedback) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error("Password is too weak", &feedback),
            ),
            Error::FutureDate(date) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Invalid transaction date",
                    &format!("{date} is a date in the future, which is not allowed."),
                ),
            ),
            Error::InvalidAmount(amount) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Invalid amount",
                    &format!("{amount} is not a positive amount."),
                ),
            ),
            Error::EmptyDescription => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error("Missing description", "Enter a short description."),
            ),
            Error::EmptyGoalTitle => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error("Missing title", "Enter a title for the goal."),
            ),
            Error::NegativeDeposit(amount) => render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Invalid deposit",
                    &format!("{amount} is negative. Deposits cannot lower the saved amount."),
                ),
            ),
            Error::DepositMissingGoal => render(
                StatusCode::NOT_FOUND,
                AlertTemplate::error(
                    "Could not update goal",
                    "The goal could not be found. \
                    Try refreshing the page to see if the goal has been deleted.",
                ),
            ),
            Error::UpdateMissingChallenge => render(
                StatusCode::NOT_FOUND,
                AlertTemplate::error(
                    "Could not update challenge",
                    "The challenge could not be found.",
                ),
            ),
            Error::InvalidCredentials => render(
                StatusCode::UNAUTHORIZED,
                AlertTemplate::error("Log-in failed", "Incorrect email or password."),
            ),
            _ => render(
                StatusCode::INTERNAL_SERVER_ERROR,
                AlertTemplate::error(
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                ),
            ),
        }
    }
}
