//! Authentication middleware that validates cookies, checks the active
//! session and extends the cookie expiry on each request.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, endpoints,
    session::get_active_session,
};

use super::cookie::{extend_auth_cookie_duration_if_needed, get_user_id_from_auth_cookie};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection, used to check the active session.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid authorization cookie and an
/// active session matching the cookie's user.
///
/// The user ID is placed into the request and the request executed normally
/// if both checks pass, otherwise a redirect to the log-in page is returned
/// using `get_redirect`.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserID>` to receive the user ID.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn() -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect();
        }
    };

    let user_id = match get_user_id_from_auth_cookie(&jar) {
        Ok(user_id) => user_id,
        Err(_) => return get_redirect(),
    };

    // The cookie may outlive the session: logging in from elsewhere replaces
    // the session row, which invalidates this cookie.
    let session_user_id = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => {
                tracing::error!("Could not acquire the database lock in the auth guard.");
                return get_redirect();
            }
        };

        match get_active_session(&connection) {
            Ok(session) => session.user_id,
            Err(_) => return get_redirect(),
        }
    };

    if session_user_id != user_id {
        tracing::debug!("Auth cookie user {user_id} does not match the active session.");
        return get_redirect();
    }

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), state.cookie_duration) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware function that checks for a valid authorization cookie.
/// The request is executed normally if the cookie is valid, otherwise a
/// redirect to the log-in page is returned.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, || {
        Redirect::to(endpoints::LOG_IN_VIEW).into_response()
    })
    .await
}

/// Middleware function that checks for a valid authorization cookie.
/// The request is executed normally if the cookie is valid, otherwise a
/// HTMX redirect to the log-in page is returned.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, || {
        (
            HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
            StatusCode::OK,
        )
            .into_response()
    })
    .await
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::{StatusCode, header::SET_COOKIE},
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie, cookie::Key};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        auth::cookie::set_auth_cookie, db::initialize, endpoints, session::start_session,
        user::UserID,
    };

    use super::{AuthState, auth_guard};

    fn get_test_state() -> AuthState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let hash = Sha512::digest("cookie test secret");

        AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration: Duration::minutes(30),
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    async fn get_protected() -> &'static str {
        "OK"
    }

    fn get_test_server(state: AuthState) -> TestServer {
        let app = Router::new()
            .route("/protected", get(get_protected))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    /// Build the encrypted auth cookies the server would set at log-in.
    fn encrypted_auth_cookies(cookie_key: &Key, user_id: UserID) -> Vec<Cookie<'static>> {
        let jar = PrivateCookieJar::new(cookie_key.clone());
        let jar = set_auth_cookie(jar, user_id, Duration::minutes(30)).unwrap();

        jar.into_response()
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|header_value| {
                Cookie::parse(header_value.to_str().unwrap().to_owned()).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn request_without_cookie_redirects_to_log_in() {
        let state = get_test_state();
        let server = get_test_server(state);

        let response = server.get("/protected").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            endpoints::LOG_IN_VIEW,
            "should redirect to the log in page"
        );
    }

    #[tokio::test]
    async fn request_with_cookie_and_session_succeeds() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            start_session(UserID::new(1), &connection).unwrap();
        }
        let cookies = encrypted_auth_cookies(&state.cookie_key, UserID::new(1));

        let server = get_test_server(state);
        let mut request = server.get("/protected");
        for cookie in cookies {
            request = request.add_cookie(cookie);
        }

        let response = request.await;

        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn request_with_cookie_but_ended_session_redirects() {
        let state = get_test_state();
        let cookies = encrypted_auth_cookies(&state.cookie_key, UserID::new(1));

        let server = get_test_server(state);
        let mut request = server.get("/protected");
        for cookie in cookies {
            request = request.add_cookie(cookie);
        }

        let response = request.await;

        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn request_with_cookie_for_replaced_session_redirects() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            // User 1 logs in, then user 2 replaces the session.
            start_session(UserID::new(1), &connection).unwrap();
            start_session(UserID::new(2), &connection).unwrap();
        }
        let cookies = encrypted_auth_cookies(&state.cookie_key, UserID::new(1));

        let server = get_test_server(state);
        let mut request = server.get("/protected");
        for cookie in cookies {
            request = request.add_cookie(cookie);
        }

        let response = request.await;

        response.assert_status(StatusCode::SEE_OTHER);
    }
}
