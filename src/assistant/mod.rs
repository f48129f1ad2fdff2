//! The AI assistant: a thin client for a hosted generative-language API and
//! the chat feature built on top of it.
//!
//! The service is treated as an opaque external collaborator: each call
//! sends natural-language text plus transaction context and expects JSON
//! matching a fixed schema back. There are no retries and no streaming.

mod chat;
mod client;

pub use chat::{ChatState, get_chat_page, post_chat_message};
pub use client::{
    AssistantClient, AssistantError, ChatReply, ChatWidget, Forecast, ForecastAlert,
    ForecastSeverity, ParsedEntry, RiskLevel, WidgetColor, WidgetKind, transaction_context,
};
