//! The transactions page and the endpoint for manual transaction entry.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, text_input,
    },
    navigation::NavBar,
};

use super::core::{NewTransaction, Transaction, TransactionKind, create_transaction, get_transactions};

/// The state needed to serve the transactions page and the manual entry
/// endpoint.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let amount_markup = match transaction.kind {
        TransactionKind::Income => html! {
            span class="text-green-600 dark:text-green-400"
            {
                "+" (format_currency(transaction.amount))
            }
        },
        TransactionKind::Expense => html! {
            span class="text-red-600 dark:text-red-400"
            {
                "-" (format_currency(transaction.amount))
            }
        },
    };

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (transaction.date.to_string()) }

            td class=(TABLE_CELL_STYLE)
            {
                (transaction.description)

                @if transaction.ai_generated {
                    span
                        class="ms-2 text-xs font-semibold text-purple-700 dark:text-purple-400"
                        title="Created from a natural-language sentence by the assistant"
                    {
                        "AI"
                    }
                }
            }

            td class=(TABLE_CELL_STYLE) { (transaction.category) }
            td class={ (TABLE_CELL_STYLE) " text-right" } { (amount_markup) }
        }
    }
}

fn totals_summary(transactions: &[Transaction]) -> Markup {
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
    let balance = income - expenses;

    html! {
        div class="grid grid-cols-1 sm:grid-cols-3 gap-4 mb-6 w-full"
        {
            div class="p-4 bg-white rounded-lg shadow dark:bg-gray-800"
            {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Income" }
                p class="text-xl font-bold text-green-600 dark:text-green-400"
                {
                    (format_currency(income))
                }
            }

            div class="p-4 bg-white rounded-lg shadow dark:bg-gray-800"
            {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Expenses" }
                p class="text-xl font-bold text-red-600 dark:text-red-400"
                {
                    (format_currency(expenses))
                }
            }

            div class="p-4 bg-white rounded-lg shadow dark:bg-gray-800"
            {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Balance" }
                p class="text-xl font-bold" { (format_currency(balance)) }
            }
        }
    }
}

fn quick_add_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::PARSE_TRANSACTION)
            hx-target="#quick-add-error"
            class="flex gap-2 mb-6 w-full"
        {
            input
                type="text"
                name="text"
                placeholder="e.g. \"gastei 35 reais no almoço hoje\""
                autocomplete="off"
                class=(FORM_TEXT_INPUT_STYLE)
                required;

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Quick add" }
        }
    }
}

fn new_transaction_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::TRANSACTIONS_API)
            hx-target="#new-transaction-error"
            class="space-y-4"
        {
            (text_input("text", "description", "Description", "", None))
            (text_input("number", "amount", "Amount", "", None))
            (text_input("text", "category", "Category", "", None))
            (text_input("date", "date", "Date", "", None))

            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select name="kind" id="kind" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="expense" { "Expense" }
                    option value="income" { "Income" }
                }
            }

            div id="new-transaction-error" {}

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add transaction" }
        }
    }
}

/// Display the transactions page: the history with totals, the manual entry
/// form, the natural-language quick-add box and the AI advice panel.
pub async fn get_transactions_page(State(state): State<TransactionsPageState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let transactions = match get_transactions(&connection) {
        Ok(transactions) => transactions,
        Err(error) => return error.into_response(),
    };

    let content = html! {
        (NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg"
            {
                h2 class="text-2xl font-bold mb-4" { "Transactions" }

                (totals_summary(&transactions))

                div
                    hx-get=(endpoints::ADVICE_API)
                    hx-trigger="load"
                    hx-swap="innerHTML"
                    class="mb-6"
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { "Loading advice..." }
                }

                (quick_add_form())
                div id="quick-add-error" class="mb-4" {}

                div class="relative overflow-x-auto shadow rounded-lg mb-8"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                            }
                        }

                        tbody
                        {
                            @for transaction in &transactions {
                                (transaction_row(transaction))
                            }
                        }
                    }
                }

                div class="max-w-md"
                {
                    h3 class="text-lg font-semibold mb-2" { "New transaction" }
                    (new_transaction_form())
                }
            }
        }
    };

    base("Transactions", &[], &content).into_response()
}

/// The form data for creating a transaction manually.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransactionData {
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// The category of the transaction.
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
}

/// Handler for creating a transaction via the POST method.
///
/// On success the client is redirected to the transactions page. Otherwise
/// an alert fragment describing the problem is returned.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionsPageState>,
    Form(new_transaction_data): Form<NewTransactionData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    let new_transaction = NewTransaction {
        description: new_transaction_data.description,
        amount: new_transaction_data.amount,
        category: new_transaction_data.category,
        date: new_transaction_data.date,
        kind: new_transaction_data.kind,
        ai_generated: false,
    };

    match create_transaction(new_transaction, &connection) {
        Ok(transaction) => {
            tracing::info!(
                "Created transaction \"{}\" ({})",
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

#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, extract::State, http::StatusCode, routing::post};
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        endpoints,
        transaction::core::{
            count_transactions, create_transaction, create_transaction_table,
            test_transactions::{new_test_expense, new_test_income},
        },
    };

    use super::{TransactionsPageState, create_transaction_endpoint, get_transactions_page};

    fn get_test_state() -> TransactionsPageState {
        let conn = Connection::open_in_memory().unwrap();
        create_transaction_table(&conn).unwrap();

        TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn transactions_page_lists_history_and_totals() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(new_test_income(), &connection).unwrap();
            create_transaction(new_test_expense(), &connection).unwrap();
        }

        let response = get_transactions_page(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);

        assert!(text.contains("Salário Mensal"));
        assert!(text.contains("Supermercado"));
        // Income 4500 minus expenses 850.50.
        assert!(text.contains("R$3,649.50"));
    }

    #[tokio::test]
    async fn create_transaction_endpoint_redirects_on_success() {
        let state = get_test_state();
        let db_connection = state.db_connection.clone();
        let app = Router::new()
            .route(endpoints::TRANSACTIONS_API, post(create_transaction_endpoint))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[
                ("description", "Padaria"),
                ("amount", "25.50"),
                ("category", "Alimentação"),
                ("date", "2023-10-21"),
                ("kind", "expense"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(HX_REDIRECT),
            endpoints::TRANSACTIONS_VIEW,
            "should redirect to the transactions page"
        );

        let connection = db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 1);
    }

    #[tokio::test]
    async fn create_transaction_endpoint_rejects_negative_amount() {
        let state = get_test_state();
        let db_connection = state.db_connection.clone();
        let app = Router::new()
            .route(endpoints::TRANSACTIONS_API, post(create_transaction_endpoint))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[
                ("description", "Padaria"),
                ("amount", "-25.50"),
                ("category", "Alimentação"),
                ("date", "2023-10-21"),
                ("kind", "expense"),
            ])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        let connection = db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn create_transaction_endpoint_rejects_malformed_form() {
        let state = get_test_state();
        let app = Router::new()
            .route(endpoints::TRANSACTIONS_API, post(create_transaction_endpoint))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[("description", "Padaria")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
