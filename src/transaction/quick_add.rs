//! Natural-language transaction entry and the AI advice panel.
//!
//! The quick-add endpoint relays a sentence to the assistant, which answers
//! with the fields of a transaction. On success the transaction is stored
//! with its provenance flag set; on failure nothing is stored.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::AlertTemplate,
    assistant::AssistantClient,
    endpoints,
    html::{format_currency, render},
    timezone::{get_local_offset, local_date},
};

use super::core::{NewTransaction, TransactionKind, create_transaction, get_transactions};

/// The state needed for the quick-add and advice endpoints.
#[derive(Clone)]
pub struct QuickAddState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the hosted generative-language API.
    pub assistant: Arc<AssistantClient>,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl FromRef<AppState> for QuickAddState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            assistant: state.assistant.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for the quick-add endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickAddData {
    /// The natural-language sentence describing a transaction.
    pub text: String,
}

/// Handler for natural-language transaction entry via the POST method.
///
/// The sentence is parsed by the assistant; the resulting transaction is
/// stored with the AI provenance flag set and the client is redirected to
/// the transactions page. If the assistant cannot parse the sentence, an
/// alert fragment is returned and nothing is stored.
pub async fn quick_add_transaction_endpoint(
    State(state): State<QuickAddState>,
    Form(quick_add_data): Form<QuickAddData>,
) -> Response {
    let today = match get_local_offset(&state.local_timezone) {
        Some(offset) => local_date(offset),
        None => {
            return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
        }
    };

    let parsed_entry = match state
        .assistant
        .parse_transaction(&quick_add_data.text, today)
        .await
    {
        Ok(parsed_entry) => parsed_entry,
        Err(error) => {
            tracing::warn!("Could not parse \"{}\": {error}", quick_add_data.text);
            return render(
                StatusCode::BAD_REQUEST,
                AlertTemplate::error(
                    "Could not understand that",
                    "The assistant could not read a transaction out of that \
                    sentence. Try rephrasing, or use the form below.",
                ),
            );
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let new_transaction = NewTransaction {
        description: parsed_entry.description,
        amount: parsed_entry.amount,
        category: parsed_entry.category,
        // The assistant occasionally invents dates; future ones are rejected
        // by create_transaction, so fold them back to today first.
        date: parsed_entry.date.min(today),
        kind: parsed_entry.kind,
        ai_generated: true,
    };

    match create_transaction(new_transaction, &connection) {
        Ok(transaction) => {
            tracing::info!(
                "Created AI-parsed transaction \"{}\" ({})",
                transaction.description,
                transaction.id
            );
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                (),
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// Handler for the AI advice panel on the transactions page.
///
/// Summarises recent activity and asks the assistant for a short tip. The
/// assistant's own fallback text is used when the service is unreachable,
/// so this endpoint always returns a fragment.
pub async fn get_financial_advice(State(state): State<QuickAddState>) -> Response {
    let summary = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_alert_response(),
        };

        let transactions = match get_transactions(&connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_alert_response(),
        };

        let income: f64 = transactions
            .iter()
            .filter(|transaction| transaction.kind == TransactionKind::Income)
            .map(|transaction| transaction.amount)
            .sum();
        let expenses: f64 = transactions
            .iter()
            .filter(|transaction| transaction.kind == TransactionKind::Expense)
            .map(|transaction| transaction.amount)
            .sum();

        let recent = transactions
            .iter()
            .take(5)
            .map(|transaction| {
                format!(
                    "{} ({}, {})",
                    transaction.description,
                    format_currency(transaction.amount),
                    transaction.kind
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "total income {}, total expenses {}, most recent: {recent}",
            format_currency(income),
            format_currency(expenses)
        )
    };

    let advice = state.assistant.financial_advice(&summary).await;

    let fragment = html! {
        div class="p-4 rounded-lg border-l-4 border-blue-500 bg-blue-50 dark:bg-gray-800"
        {
            p class="text-sm font-semibold mb-1" { "Assistant tip" }
            p class="text-sm" { (advice) }
        }
    };

    render(StatusCode::OK, fragment)
}
