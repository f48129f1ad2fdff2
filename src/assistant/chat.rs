//! The chat page and the endpoint that relays messages to the assistant.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, render},
    navigation::NavBar,
    timezone::{get_local_offset, local_date},
    transaction::get_transactions,
};

use super::client::{AssistantClient, ChatReply, ChatWidget, WidgetColor, WidgetKind};

/// The state needed to serve the chat page and relay chat messages.
#[derive(Clone)]
pub struct ChatState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the hosted generative-language API.
    pub assistant: Arc<AssistantClient>,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl FromRef<AppState> for ChatState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            assistant: state.assistant.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn user_bubble(message: &str) -> Markup {
    html! {
        div class="flex justify-end"
        {
            p class="max-w-md px-4 py-2 rounded-2xl rounded-br-sm bg-blue-600 text-white"
            {
                (message)
            }
        }
    }
}

fn widget_card(widget: &ChatWidget) -> Markup {
    let accent = match widget.color {
        Some(WidgetColor::Emerald) => "border-emerald-500",
        Some(WidgetColor::Red) => "border-red-500",
        Some(WidgetColor::Amber) => "border-amber-500",
        Some(WidgetColor::Blue) | None => "border-blue-500",
    };
    let kind_label = match widget.kind {
        WidgetKind::Stat => "Stat",
        WidgetKind::Alert => "Alert",
        WidgetKind::SavingTip => "Saving tip",
    };

    html! {
        div class={ "mt-2 p-3 rounded-lg border-l-4 bg-gray-50 dark:bg-gray-700 " (accent) }
        {
            p class="text-xs uppercase text-gray-500 dark:text-gray-400" { (kind_label) }
            p class="text-sm font-semibold" { (widget.title) }

            @if let Some(value) = &widget.value {
                p class="text-xl font-bold" { (value) }
            }

            p class="text-sm text-gray-600 dark:text-gray-300" { (widget.description) }
        }
    }
}

fn assistant_bubble(reply: &ChatReply) -> Markup {
    html! {
        div class="flex justify-start"
        {
            div class="max-w-md px-4 py-2 rounded-2xl rounded-bl-sm bg-white dark:bg-gray-800 \
                shadow text-gray-900 dark:text-white"
            {
                p { (reply.text) }

                @if let Some(widget) = &reply.widget {
                    (widget_card(widget))
                }
            }
        }
    }
}

/// Display the chat page.
pub async fn get_chat_page() -> Response {
    let welcome = ChatReply {
        text: "Hi! I am your finance assistant. Ask me anything about your \
            income, expenses or how much you could save."
            .to_string(),
        widget: None,
    };

    let content = html! {
        (NavBar::new(endpoints::CHAT_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-md"
            {
                h2 class="text-2xl font-bold mb-4" { "Assistant" }

                div id="chat-thread" class="flex flex-col gap-3 mb-4"
                {
                    (assistant_bubble(&welcome))
                }

                form
                    hx-post=(endpoints::CHAT_API)
                    hx-target="#chat-thread"
                    hx-swap="beforeend"
                    class="flex gap-2"
                {
                    input
                        type="text"
                        name="message"
                        placeholder="e.g. How much did I spend on leisure?"
                        autocomplete="off"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Send" }
                }
            }
        }
    };

    base("Assistant", &[], &content).into_response()
}

/// The form data for a chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageData {
    /// The user's message.
    pub message: String,
}

/// Handler for chat messages via the POST method.
///
/// Relays the message and the transaction history to the assistant and
/// returns the user's bubble plus the assistant's reply as an HTML fragment
/// for HTMX to append to the thread. Assistant failures surface as a
/// fallback reply, never as an error page.
pub async fn post_chat_message(
    State(state): State<ChatState>,
    Form(chat_message): Form<ChatMessageData>,
) -> Response {
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

    let today = match get_local_offset(&state.local_timezone) {
        Some(offset) => local_date(offset),
        None => {
            return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
        }
    };

    let reply = state
        .assistant
        .chat(&chat_message.message, &transactions, today)
        .await;

    let fragment = html! {
        (user_bubble(&chat_message.message))
        (assistant_bubble(&reply))
    };

    render(StatusCode::OK, fragment)
}


#[cfg(test)]
mod bubble_tests {
    use crate::assistant::client::{ChatReply, ChatWidget, WidgetColor, WidgetKind};

    use super::{assistant_bubble, user_bubble};

    #[test]
    fn user_bubble_escapes_html() {
        let markup = user_bubble("<script>alert(1)</script>").into_string();

        assert!(!markup.contains("<script>alert(1)</script>"));
        assert!(markup.contains("&lt;script&gt;"));
    }

    #[test]
    fn assistant_bubble_renders_widget() {
        let reply = ChatReply {
            text: "You spent R$ 120 on leisure.".to_string(),
            widget: Some(ChatWidget {
                kind: WidgetKind::Stat,
                title: "Leisure this month".to_string(),
                value: Some("R$ 120,00".to_string()),
                description: "Total of leisure expenses.".to_string(),
                color: Some(WidgetColor::Amber),
            }),
        };

        let markup = assistant_bubble(&reply).into_string();

        assert!(markup.contains("Leisure this month"));
        assert!(markup.contains("R$ 120,00"));
        assert!(markup.contains("border-amber-500"));
    }
}
