//! User authentication: private cookie handling and the middleware that
//! guards logged-in routes.
//!
//! A request is authenticated when its private cookie carries a user ID
//! that matches the active session row in the database. The log-in,
//! registration and password recovery flows live in their own modules.

mod cookie;
mod middleware;

pub(crate) use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub(crate) use middleware::{auth_guard, auth_guard_hx};
