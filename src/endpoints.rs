//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/goals/{goal_id}/deposit',
//! use [format_endpoint].

/// The root route which redirects to the transactions or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users: the transaction history.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for savings goals and challenges.
pub const GOALS_VIEW: &str = "/goals";
/// The page for split-group balances.
pub const SPLIT_VIEW: &str = "/split";
/// The page with aggregate charts and the AI forecast.
pub const CHARTS_VIEW: &str = "/charts";
/// The page for chatting with the AI assistant.
pub const CHAT_VIEW: &str = "/chat";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for instructions for resetting the user's password.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register a user.
pub const USERS: &str = "/api/users";
/// The route for requesting a password recovery link.
pub const FORGOT_PASSWORD_API: &str = "/api/forgot_password";
/// The route to create a transaction.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to create a transaction from a natural-language sentence.
pub const PARSE_TRANSACTION: &str = "/api/transactions/parse";
/// The route to create a goal.
pub const GOALS_API: &str = "/api/goals";
/// The route to deposit money into a goal.
pub const GOAL_DEPOSIT: &str = "/api/goals/{goal_id}/deposit";
/// The route to update a challenge's progress.
pub const CHALLENGE_PROGRESS: &str = "/api/challenges/{challenge_id}/progress";
/// The route to send a chat message to the AI assistant.
pub const CHAT_API: &str = "/api/chat";
/// The route for the AI advice fragment on the transactions page.
pub const ADVICE_API: &str = "/api/advice";
/// The route for the AI forecast fragment on the charts page.
pub const FORECAST_API: &str = "/api/forecast";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/goals/{goal_id}/deposit',
/// '{goal_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::GOALS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::SPLIT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::CHARTS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::CHAT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::FORGOT_PASSWORD_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(endpoints::COFFEE);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::USERS);
        assert_endpoint_is_valid_uri(endpoints::FORGOT_PASSWORD_API);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_API);
        assert_endpoint_is_valid_uri(endpoints::PARSE_TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::GOALS_API);
        assert_endpoint_is_valid_uri(endpoints::GOAL_DEPOSIT);
        assert_endpoint_is_valid_uri(endpoints::CHALLENGE_PROGRESS);
        assert_endpoint_is_valid_uri(endpoints::CHAT_API);
        assert_endpoint_is_valid_uri(endpoints::ADVICE_API);
        assert_endpoint_is_valid_uri(endpoints::FORECAST_API);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/api/goals/{goal_id}/deposit", 7);

        assert_eq!(formatted_path, "/api/goals/7/deposit");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
