//! Route handlers for the charts page and the AI forecast fragment.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::AlertTemplate,
    assistant::{AssistantClient, Forecast, ForecastSeverity, RiskLevel},
    endpoints,
    html::{HeadElement, PAGE_CONTAINER_STYLE, base, format_currency, render},
    navigation::NavBar,
    transaction::get_transactions,
};

use super::view::{PageChart, category_chart, charts_script, charts_view, income_expense_chart};

/// The state needed to serve the charts page and the forecast fragment.
#[derive(Clone)]
pub struct ChartsState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the hosted generative-language API.
    pub assistant: Arc<AssistantClient>,
}

impl FromRef<AppState> for ChartsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            assistant: state.assistant.clone(),
        }
    }
}

/// Display the charts page.
pub async fn get_charts_page(State(state): State<ChartsState>) -> Response {
    let transactions = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match get_transactions(&connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        }
    };

    let charts = [
        PageChart {
            id: "category-chart",
            options: category_chart(&transactions).to_string(),
        },
        PageChart {
            id: "income-expense-chart",
            options: income_expense_chart(&transactions).to_string(),
        },
    ];

    let head_elements = [
        HeadElement::ScriptLink("/static/echarts-5.5.0-min.js".to_string()),
        charts_script(&charts),
    ];

    let content = html! {
        (NavBar::new(endpoints::CHARTS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg"
            {
                h2 class="text-2xl font-bold mb-4" { "Charts" }

                (charts_view(&charts))

                div
                    hx-get=(endpoints::FORECAST_API)
                    hx-trigger="load"
                    hx-swap="innerHTML"
                {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Generating forecast..."
                    }
                }
            }
        }
    };

    base("Charts", &head_elements, &content).into_response()
}

fn severity_style(severity: ForecastSeverity) -> &'static str {
    match severity {
        ForecastSeverity::Info => "border-blue-500",
        ForecastSeverity::Warning => "border-amber-500",
        ForecastSeverity::Critical => "border-red-500",
    }
}

fn risk_style(risk_level: RiskLevel) -> &'static str {
    match risk_level {
        RiskLevel::Low => "text-green-600 dark:text-green-400",
        RiskLevel::Medium => "text-amber-600 dark:text-amber-400",
        RiskLevel::High => "text-red-600 dark:text-red-400",
    }
}

fn forecast_view(forecast: &Forecast) -> Markup {
    html! {
        section class="w-full p-6 bg-white rounded-lg shadow dark:bg-gray-800"
        {
            h3 class="text-lg font-semibold mb-3" { "Next month forecast" }

            div class="flex items-baseline gap-4 mb-4"
            {
                p class="text-2xl font-bold"
                {
                    (format_currency(forecast.predicted_total_next_month))
                }

                p class={ "font-semibold " (risk_style(forecast.risk_level)) }
                {
                    (forecast.risk_level.label()) " risk"
                }
            }

            @for alert in &forecast.alerts {
                div class={ "p-3 mb-2 rounded border-l-4 bg-gray-50 dark:bg-gray-700 " (severity_style(alert.severity)) }
                {
                    p class="text-sm font-semibold" { (alert.title) }
                    p class="text-sm" { (alert.message) }
                }
            }

            @if !forecast.suggestions.is_empty() {
                p class="text-sm font-semibold mt-3 mb-1" { "Suggestions" }

                ul class="list-disc list-inside text-sm"
                {
                    @for suggestion in &forecast.suggestions {
                        li { (suggestion) }
                    }
                }
            }
        }
    }
}

/// Handler for the AI forecast fragment on the charts page.
///
/// Asks the assistant for a spending forecast over the expense history and
/// renders it as an HTML fragment. Assistant failures produce an alert
/// fragment rather than an error page.
pub async fn get_forecast_fragment(State(state): State<ChartsState>) -> Response {
    let transactions = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_alert_response(),
        };

        match get_transactions(&connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_alert_response(),
        }
    };

    match state.assistant.forecast(&transactions).await {
        Ok(forecast) => render(StatusCode::OK, forecast_view(&forecast)),
        Err(error) => {
            tracing::warn!("Could not generate forecast: {error}");
            render(
                StatusCode::OK,
                AlertTemplate::error(
                    "Forecast unavailable",
                    "The assistant could not generate a forecast right now. \
                    Try again later.",
                ),
            )
        }
    }
}

#[cfg(test)]
mod forecast_view_tests {
    use crate::assistant::{Forecast, ForecastAlert, ForecastSeverity, RiskLevel};

    use super::forecast_view;

    #[test]
    fn forecast_view_renders_risk_alerts_and_suggestions() {
        let forecast = Forecast {
            predicted_total_next_month: 1016.40,
            risk_level: RiskLevel::High,
            alerts: vec![ForecastAlert {
                title: "Delivery spending".to_string(),
                message: "Delivery expenses doubled since last month.".to_string(),
                severity: ForecastSeverity::Warning,
            }],
            suggestions: vec!["Cook at home twice a week".to_string()],
        };

        let markup = forecast_view(&forecast).into_string();

        assert!(markup.contains("R$1,016.40"));
        assert!(markup.contains("High risk"));
        assert!(markup.contains("Delivery spending"));
        assert!(markup.contains("Cook at home twice a week"));
    }

    #[test]
    fn forecast_view_omits_empty_suggestion_list() {
        let forecast = Forecast {
            predicted_total_next_month: 100.0,
            risk_level: RiskLevel::Low,
            alerts: vec![],
            suggestions: vec![],
        };

        let markup = forecast_view(&forecast).into_string();

        assert!(!markup.contains("Suggestions"));
    }
}
