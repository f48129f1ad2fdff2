//! The registration page for creating a new account.
//!
//! A successful registration logs the new user straight in: the session row
//! is replaced and the auth cookie set.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use email_address::EmailAddress;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Duration};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, auth_card, base,
        loading_spinner, password_input, text_input,
    },
    session::start_session,
    user::{Cpf, NewUser, create_user},
};

/// The minimum number of characters the password should have to be considered valid on the
/// client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

/// The values the user already entered, echoed back when the form is
/// re-rendered with errors.
#[derive(Default)]
struct FormValues<'a> {
    name: &'a str,
    email: &'a str,
    cpf: &'a str,
    birth_date: &'a str,
}

/// Per-field error messages for the registration form.
#[derive(Default)]
struct FormErrors<'a> {
    email: Option<&'a str>,
    cpf: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()];

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

fn registration_form(values: &FormValues, errors: &FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("text", "name", "Name", values.name, None))
            (text_input("email", "email", "Email", values.email, errors.email))
            (text_input("text", "cpf", "CPF", values.cpf, errors.cpf))
            (text_input("date", "birth_date", "Date of birth", values.birth_date, None))
            (password_input("", PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

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

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form(&FormValues::default(), &FormErrors::default());
    let content = auth_card("Create your account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl RegistrationState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Clone, Deserialize)]
pub struct RegistrationData {
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The user's CPF.
    pub cpf: String,
    /// The user's date of birth.
    pub birth_date: Date,
    /// The password to protect the new account with.
    pub password: String,
    /// Must match `password`; guards against typos.
    pub confirm_password: String,
}

/// Handler for registration requests via the POST method.
///
/// On success the user is created, logged in (auto-login) and redirected to
/// the transactions page. Otherwise, the form is returned with an error
/// message next to the field that caused the problem.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(registration_data): Form<RegistrationData>,
) -> Response {
    let birth_date_string = registration_data.birth_date.to_string();
    let values = FormValues {
        name: &registration_data.name,
        email: &registration_data.email,
        cpf: &registration_data.cpf,
        birth_date: &birth_date_string,
    };

    if registration_data.password != registration_data.confirm_password {
        return registration_form(
            &values,
            &FormErrors {
                confirm_password: Some("The passwords do not match."),
                ..Default::default()
            },
        )
        .into_response();
    }

    let validated_password = match ValidatedPassword::new(&registration_data.password) {
        Ok(validated_password) => validated_password,
        Err(Error::TooWeak(feedback)) => {
            return registration_form(
                &values,
                &FormErrors {
                    password: Some(&feedback),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while validating password: {error}");
            return error.into_response();
        }
    };

    let email = match EmailAddress::from_str(&registration_data.email) {
        Ok(email) => email,
        Err(_) => {
            return registration_form(
                &values,
                &FormErrors {
                    email: Some("This is not a valid email address."),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    let cpf = match Cpf::new(&registration_data.cpf) {
        Ok(cpf) => cpf,
        Err(_) => {
            return registration_form(
                &values,
                &FormErrors {
                    cpf: Some("A CPF has eleven digits, e.g. 123.456.789-09."),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => {
            tracing::error!("Could not hash password: {error}");
            return error.into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let new_user = NewUser {
        name: registration_data.name.clone(),
        email,
        password_hash,
        cpf,
        birth_date: registration_data.birth_date,
    };

    let user = match create_user(new_user, &connection) {
        Ok(user) => user,
        Err(Error::DuplicateEmail) => {
            return registration_form(
                &values,
                &FormErrors {
                    email: Some("This email address is already registered."),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(Error::DuplicateCpf) => {
            return registration_form(
                &values,
                &FormErrors {
                    cpf: Some("This CPF is already registered."),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Could not create user: {error}");
            return error.into_response();
        }
    };

    // Auto-login after registration.
    if let Err(error) = start_session(user.id, &connection) {
        tracing::error!("Could not start session: {error}");
        return error.into_response();
    }

    set_auth_cookie(jar.clone(), user.id, state.cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}
