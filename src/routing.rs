//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    assistant::{get_chat_page, post_chat_message},
    auth::{auth_guard, auth_guard_hx},
    challenge::set_progress_endpoint,
    charts::{get_charts_page, get_forecast_fragment},
    endpoints,
    forgot_password::{get_forgot_password_page, post_forgot_password},
    goal::{create_goal_endpoint, deposit_endpoint, get_goals_page},
    internal_server_error::get_internal_server_error_page,
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    not_found::get_404_not_found,
    register_user::{get_register_page, register_user},
    split_group::get_split_page,
    transaction::{
        create_transaction_endpoint, get_financial_advice, get_transactions_page,
        quick_add_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::FORGOT_PASSWORD_API, post(post_forgot_password))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::GOALS_VIEW, get(get_goals_page))
        .route(endpoints::SPLIT_VIEW, get(get_split_page))
        .route(endpoints::CHARTS_VIEW, get(get_charts_page))
        .route(endpoints::CHAT_VIEW, get(get_chat_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These API routes need to use the HX-REDIRECT header for auth redirects
    // to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::PARSE_TRANSACTION,
                post(quick_add_transaction_endpoint),
            )
            .route(endpoints::GOALS_API, post(create_goal_endpoint))
            .route(endpoints::GOAL_DEPOSIT, post(deposit_endpoint))
            .route(endpoints::CHALLENGE_PROGRESS, post(set_progress_endpoint))
            .route(endpoints::CHAT_API, post(post_chat_message))
            .route(endpoints::ADVICE_API, get(get_financial_advice))
            .route(endpoints::FORECAST_API, get(get_forecast_fragment))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

/// The root path '/' redirects to the transactions page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::TRANSACTIONS_VIEW)
}
