//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, auth_card, base, loading_spinner, password_input, text_input},
    session::start_session,
    user::get_user_by_email,
};

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "email", "Email", email, None))
            (password_input("", 0, error_message))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "

                a
                    href=(endpoints::FORGOT_PASSWORD_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Reset it here"
                }
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a
                    href=(endpoints::REGISTER_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Register here"
                }
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let log_in_form = log_in_form("", None);
    let content = auth_card("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LoginState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect email or password.";

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session row is replaced, the auth
/// cookie is set and the client is redirected to the transactions page.
/// Otherwise, the form is returned with an error message explaining the
/// problem.
///
/// A wrong email and a wrong password produce the same error message, so
/// the response does not reveal which emails are registered.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let user = match get_user_by_email(&user_data.email, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            return log_in_form(&user_data.email, Some(INVALID_CREDENTIALS_ERROR_MSG))
                .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                &user_data.email,
                Some("An internal error occurred. Please try again later."),
            )
            .into_response();
        }
    };

    let is_password_valid = match user.password_hash.verify(&user_data.password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                &user_data.email,
                Some("An internal error occurred. Please try again later."),
            )
            .into_response();
        }
    };

    if !is_password_valid {
        return log_in_form(&user_data.email, Some(INVALID_CREDENTIALS_ERROR_MSG))
            .into_response();
    }

    // Replaces any previous session: at most one user is logged in at a time.
    match start_session(user.id, &connection) {
        Ok(session) => {
            tracing::info!(
                "Started session for user {} at {}",
                session.user_id,
                session.started_at
            );
        }
        Err(error) => {
            tracing::error!("Could not start session: {error}");
            return error.into_response();
        }
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

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

#[cfg(test)]
mod log_in_page_tests {
    use axum::http::{StatusCode, header::CONTENT_TYPE};

    use crate::endpoints;

    use super::get_log_in_page;

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);
        let document = scraper::Html::parse_document(&text);

        let form_selector = scraper::Selector::parse("form").unwrap();
        let forms = document.select(&form_selector).collect::<Vec<_>>();
        assert_eq!(forms.len(), 1, "want 1 form, got {}", forms.len());
        let form = forms.first().unwrap();
        let hx_post = form.value().attr("hx-post");
        assert_eq!(
            hx_post,
            Some(endpoints::LOG_IN_API),
            "want form with attribute hx-post=\"{}\", got {:?}",
            endpoints::LOG_IN_API,
            hx_post
        );

        for selector_string in ["input[type=email]", "input[type=password]", "button[type=submit]"]
        {
            let selector = scraper::Selector::parse(selector_string).unwrap();
            let elements = form.select(&selector).collect::<Vec<_>>();
            assert_eq!(
                elements.len(),
                1,
                "want 1 element matching {selector_string}, got {}",
                elements.len()
            );
        }

        let link_selector = scraper::Selector::parse("a[href]").unwrap();
        let links: Vec<_> = form
            .select(&link_selector)
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert!(links.contains(&endpoints::FORGOT_PASSWORD_VIEW));
        assert!(links.contains(&endpoints::REGISTER_VIEW));
    }
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        PasswordHash, ValidatedPassword, db::initialize, endpoints,
        session::get_active_session,
        user::{NewUser, create_user, test_user::new_test_user},
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LoginState, post_log_in};

    fn get_test_state_with_user() -> LoginState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        // Cost 4 keeps the test fast; the hash is still verifiable.
        create_user(
            NewUser {
                password_hash: PasswordHash::new(ValidatedPassword::new_unchecked("test"), 4)
                    .unwrap(),
                ..new_test_user()
            },
            &connection,
        )
        .expect("Could not create test user");

        LoginState::new("foobar", Arc::new(Mutex::new(connection)))
    }

    fn get_test_server(state: LoginState) -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state_with_user();
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[
                ("email", "ana@example.com"),
                ("password", "test"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(HX_REDIRECT), endpoints::TRANSACTIONS_VIEW);
        assert!(
            response.maybe_cookie("user_id").is_some(),
            "log-in should set the auth cookie"
        );

        let connection = db_connection.lock().unwrap();
        let session = get_active_session(&connection).expect("log-in should start a session");
        assert_eq!(session.user_id.as_i64(), 1);
    }

    #[tokio::test]
    async fn log_in_replaces_previous_session() {
        let state = get_test_state_with_user();
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        server
            .post(endpoints::LOG_IN_API)
            .form(&[
                ("email", "ana@example.com"),
                ("password", "test"),
            ])
            .await;
        server
            .post(endpoints::LOG_IN_API)
            .form(&[
                ("email", "ana@example.com"),
                ("password", "test"),
            ])
            .await;

        let connection = db_connection.lock().unwrap();
        let session_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM session", [], |row| row.get(0))
            .unwrap();
        assert_eq!(session_count, 1, "want a single active session");
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let state = get_test_state_with_user();
        let db_connection = state.db_connection.clone();
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", "ana@example.com"), ("password", "wrongpassword")])
            .await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_CREDENTIALS_ERROR_MSG);

        let connection = db_connection.lock().unwrap();
        assert!(
            get_active_session(&connection).is_err(),
            "failed log-in should not start a session"
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email_and_same_message() {
        let state = get_test_state_with_user();
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[
                ("email", "nobody@example.com"),
                ("password", "test"),
            ])
            .await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let state = get_test_state_with_user();
        let server = get_test_server(state);

        server
            .post(endpoints::LOG_IN_API)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
