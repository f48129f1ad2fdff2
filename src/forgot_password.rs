//! The password recovery page.
//!
//! Recovery is a simulation: no email or SMS is actually sent. A registered
//! email gets a "link sent" message, a long numeric identifier is treated
//! as a phone number and gets an "SMS sent" message, and anything else is
//! reported as not found.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::AlertTemplate,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, auth_card, base, render, text_input},
    user::get_user_by_email,
};

fn forgot_password_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::FORGOT_PASSWORD_API)
            hx-target="#recovery-result"
            class="space-y-4 md:space-y-6"
        {
            (text_input(
                "text",
                "identifier",
                "Email or phone number",
                "",
                None,
            ))

            div id="recovery-result" {}

            button type="submit" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                "Send recovery instructions"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered your password? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                    "Log in here"
                }
            }
        }
    }
}

/// Display the password recovery page.
pub async fn get_forgot_password_page() -> Response {
    let form = forgot_password_form();
    let content = auth_card("Recover your password", &form);
    base("Forgot Password", &[], &content).into_response()
}

/// The state needed to handle recovery requests.
#[derive(Debug, Clone)]
pub struct ForgotPasswordState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ForgotPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for a recovery request.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryData {
    /// The email address or phone number to send recovery instructions to.
    pub identifier: String,
}

/// Handler for password recovery requests via the POST method.
///
/// Returns an alert fragment reporting what was (pretend) sent.
pub async fn post_forgot_password(
    State(state): State<ForgotPasswordState>,
    Form(recovery_data): Form<RecoveryData>,
) -> Response {
    let identifier = recovery_data.identifier.trim();

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    match get_user_by_email(identifier, &connection) {
        Ok(_) => {
            return render(
                StatusCode::OK,
                AlertTemplate::success(
                    "Recovery link sent",
                    &format!("A recovery link has been sent to {identifier}."),
                ),
            );
        }
        Err(Error::NotFound) => {}
        Err(error) => return error.into_alert_response(),
    }

    // Not a registered email. If it looks like a phone number, pretend to
    // send an SMS instead.
    let digits: String = identifier.chars().filter(char::is_ascii_digit).collect();
    let is_phone = !digits.is_empty() && digits.len() == identifier.len();

    if is_phone && identifier.len() > 8 {
        return render(
            StatusCode::OK,
            AlertTemplate::success(
                "Recovery SMS sent",
                &format!("A recovery SMS has been sent to {identifier}."),
            ),
        );
    }

    render(
        StatusCode::NOT_FOUND,
        AlertTemplate::error("User not found", "No account matches that email or phone."),
    )
}
