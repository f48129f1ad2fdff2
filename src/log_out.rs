//! The log-out route: ends the active session and invalidates the cookie.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;

use crate::{
    AppState, Error, auth::invalidate_auth_cookie, endpoints, session::end_session,
};

/// The state needed to log out.
#[derive(Clone)]
pub struct LogoutState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogoutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogoutState> for Key {
    fn from_ref(state: &LogoutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for log-out requests.
///
/// Ends the active session, invalidates the auth cookie and redirects to
/// the log-in page. Logging out twice is harmless.
pub async fn get_log_out(State(state): State<LogoutState>, jar: PrivateCookieJar) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    if let Err(error) = end_session(&connection) {
        tracing::error!("Could not end session: {error}");
        return error.into_response();
    }

    (
        invalidate_auth_cookie(jar),
        Redirect::to(endpoints::LOG_IN_VIEW),
    )
        .into_response()
}

#[cfg(test)]
mod log_out_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};

    use crate::{
        db::initialize,
        endpoints,
        session::{get_active_session, start_session},
        user::UserID,
    };

    use super::{LogoutState, get_log_out};

    #[tokio::test]
    async fn log_out_ends_session_and_redirects() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        start_session(UserID::new(1), &connection).unwrap();

        let hash = Sha512::digest("log out test secret");
        let state = LogoutState {
            cookie_key: Key::from(&hash),
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let db_connection = state.db_connection.clone();

        let app = Router::new()
            .route(endpoints::LOG_OUT, get(get_log_out))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);

        let connection = db_connection.lock().unwrap();
        assert!(
            get_active_session(&connection).is_err(),
            "log-out should end the session"
        );
    }

    #[tokio::test]
    async fn log_out_without_session_still_redirects() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let hash = Sha512::digest("log out test secret");
        let state = LogoutState {
            cookie_key: Key::from(&hash),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(endpoints::LOG_OUT, get(get_log_out))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status(StatusCode::SEE_OTHER);
    }
}
