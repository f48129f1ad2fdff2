//! The client for the hosted generative-language API.
//!
//! Requests go to a `generateContent`-style endpoint. Structured calls send
//! a response JSON schema along with the prompt and parse the returned JSON
//! into typed structs; free-text calls return the reply as-is.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::Date;

use crate::transaction::{Transaction, TransactionKind};

/// The errors that may occur when talking to the assistant API.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The HTTP request itself failed (connection, timeout, ...).
    #[error("the assistant request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("the assistant API returned {status}: {message}")]
    Api {
        /// The HTTP status code of the reply.
        status: StatusCode,
        /// The error message from the reply body, if any.
        message: String,
    },

    /// The API answered successfully but with no usable text.
    #[error("the assistant reply was empty")]
    EmptyReply,

    /// The reply text could not be parsed as the expected JSON schema.
    #[error("could not parse the assistant reply: {0}")]
    MalformedReply(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// A transaction parsed from a natural-language sentence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedEntry {
    /// The amount of money, always positive.
    pub amount: f64,
    /// A short description of the transaction.
    pub description: String,
    /// The category of the transaction.
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
}

/// The overall risk level of a financial forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Spending is well within income.
    Low,
    /// Spending is close to income.
    Medium,
    /// Spending exceeds or threatens to exceed income.
    High,
}

impl RiskLevel {
    /// A human-readable label for the risk level.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// The severity of a forecast alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastSeverity {
    /// Something worth knowing.
    Info,
    /// Something worth acting on.
    Warning,
    /// Something that needs attention now.
    Critical,
}

/// A single alert inside a forecast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastAlert {
    /// A short alert title.
    pub title: String,
    /// The alert message.
    pub message: String,
    /// How urgent the alert is.
    pub severity: ForecastSeverity,
}

/// A spending forecast for the next month.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast {
    /// The predicted total spending for the next month.
    pub predicted_total_next_month: f64,
    /// The overall risk level.
    pub risk_level: RiskLevel,
    /// Budget alerts, possibly empty.
    #[serde(default)]
    pub alerts: Vec<ForecastAlert>,
    /// Practical saving suggestions.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// The kind of widget attached to a chat reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// A highlighted number, e.g. the month's total income.
    Stat,
    /// A warning the user should see.
    Alert,
    /// A concrete tip for saving money.
    SavingTip,
}

/// The accent colour of a chat widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetColor {
    /// Green, for good news.
    Emerald,
    /// Red, for warnings.
    Red,
    /// Blue, neutral.
    Blue,
    /// Amber, for caution.
    Amber,
}

/// A small card complementing a chat reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatWidget {
    /// The kind of widget.
    pub kind: WidgetKind,
    /// The widget title.
    pub title: String,
    /// An optional highlighted value, e.g. "R$ 450,00" or "+15%".
    pub value: Option<String>,
    /// The widget body text.
    pub description: String,
    /// An optional accent colour.
    pub color: Option<WidgetColor>,
}

/// A reply from the chat assistant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    /// The textual reply to show in the chat thread.
    pub text: String,
    /// An optional card complementing the reply.
    pub widget: Option<ChatWidget>,
}

/// Format the transaction history as the context block sent with assistant
/// requests.
pub fn transaction_context(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|transaction| {
            let direction = match transaction.kind {
                TransactionKind::Income => "INCOME",
                TransactionKind::Expense => "EXPENSE",
            };

            format!(
                "[{}] ({}) {}: R$ {:.2} ({})",
                transaction.date,
                direction,
                transaction.description,
                transaction.amount,
                transaction.category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The fallback advice shown when the assistant cannot be reached.
pub(crate) const ADVICE_FALLBACK: &str =
    "Managing your income and expenses well is the key to reaching your goals.";

/// The fallback chat reply shown when the assistant cannot be reached.
pub(crate) const CHAT_FALLBACK: &str =
    "Sorry, I could not reach the assistant right now. Please try again later.";

/// Client for the hosted generative-language API.
pub struct AssistantClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AssistantClient {
    /// Create a new assistant client.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Create a client from the `ASSISTANT_BASE_URL`, `ASSISTANT_API_KEY`
    /// and `ASSISTANT_MODEL` environment variables.
    ///
    /// Returns `None` if the API key is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ASSISTANT_API_KEY").ok()?;
        let base_url = std::env::var("ASSISTANT_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        let model =
            std::env::var("ASSISTANT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        Some(Self::new(&base_url, &api_key, &model))
    }

    async fn generate(
        &self,
        prompt: String,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, AssistantError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error)
                .and_then(|detail| detail.message)
                .unwrap_or(body);

            return Err(AssistantError::Api { status, message });
        }

        let generate_response: GenerateResponse = serde_json::from_str(&body)?;

        let text = generate_response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AssistantError::EmptyReply);
        }

        Ok(text)
    }

    async fn generate_json(&self, prompt: String, schema: Value) -> Result<String, AssistantError> {
        self.generate(
            prompt,
            Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        )
        .await
    }

    /// Parse a natural-language sentence into the fields of a transaction.
    ///
    /// The sentence may be in any language; `today` is used when the
    /// sentence does not mention a date.
    ///
    /// # Errors
    /// Returns an [AssistantError] if the service cannot be reached or its
    /// reply does not match the expected schema.
    pub async fn parse_transaction(
        &self,
        text: &str,
        today: Date,
    ) -> Result<ParsedEntry, AssistantError> {
        let prompt = format!(
            "Extract the financial transaction from this sentence: \"{text}\".\n\
            Decide whether it is an expense (a purchase or payment) or income \
            (a salary, sale or other money received). The amount is always \
            positive. If no date is mentioned, use today's date: {today}.\n\
            Suggested expense categories: Alimentação, Transporte, Moradia, \
            Lazer, Saúde, Outros.\n\
            Suggested income categories: Salário, Freelance, Investimentos, \
            Presente, Outros."
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "amount": { "type": "number", "description": "The numeric amount, positive" },
                "description": { "type": "string", "description": "A short description" },
                "category": { "type": "string", "description": "The transaction category" },
                "date": { "type": "string", "description": "The date in YYYY-MM-DD format" },
                "kind": { "type": "string", "enum": ["income", "expense"] }
            },
            "required": ["amount", "description", "category", "date", "kind"]
        });

        let reply = self.generate_json(prompt, schema).await?;

        Ok(serde_json::from_str(&reply)?)
    }

    /// Get a short piece of financial advice for a summary of recent
    /// activity.
    ///
    /// Failures are swallowed: if the service cannot be reached, a fixed
    /// fallback string is returned instead.
    pub async fn financial_advice(&self, summary: &str) -> String {
        let prompt = format!(
            "Act as a senior financial advisor. Look at this summary of \
            recent activity and give one short, motivating tip of at most \
            two sentences: {summary}"
        );

        match self.generate(prompt, None).await {
            Ok(advice) => advice,
            Err(error) => {
                tracing::warn!("Could not get financial advice: {error}");
                ADVICE_FALLBACK.to_string()
            }
        }
    }

    /// Generate a spending forecast for the next month from the expense
    /// history.
    ///
    /// # Errors
    /// Returns an [AssistantError] if the service cannot be reached or its
    /// reply does not match the expected schema.
    pub async fn forecast(
        &self,
        transactions: &[Transaction],
    ) -> Result<Forecast, AssistantError> {
        let expenses: Vec<Transaction> = transactions
            .iter()
            .filter(|transaction| transaction.kind == TransactionKind::Expense)
            .cloned()
            .collect();

        let prompt = format!(
            "As a financial analyst, look at the following expense history \
            and produce a forecast for next month. Point out budget risks \
            and suggest three practical ways to save.\n\n\
            Expense history:\n{}",
            transaction_context(&expenses)
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "predicted_total_next_month": {
                    "type": "number",
                    "description": "Predicted total spending for next month"
                },
                "risk_level": { "type": "string", "enum": ["low", "medium", "high"] },
                "alerts": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "message": { "type": "string" },
                            "severity": { "type": "string", "enum": ["info", "warning", "critical"] }
                        },
                        "required": ["title", "message", "severity"]
                    }
                },
                "suggestions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Three practical saving suggestions"
                }
            },
            "required": ["predicted_total_next_month", "risk_level"]
        });

        let reply = self.generate_json(prompt, schema).await?;

        Ok(serde_json::from_str(&reply)?)
    }

    /// Answer a chat message using the transaction history as context.
    ///
    /// Failures are swallowed: if the service cannot be reached, a fixed
    /// fallback reply with no widget is returned instead.
    pub async fn chat(
        &self,
        message: &str,
        transactions: &[Transaction],
        today: Date,
    ) -> ChatReply {
        let prompt = format!(
            "You are the personal finance assistant of the Cash Hub app. \
            Today is {today}.\n\n\
            The user's transaction history:\n{}\n\n\
            The user asks: \"{message}\"\n\n\
            Answer from the data, considering both income and expenses. Be \
            direct and friendly. If the answer involves an important number, \
            a warning or a concrete tip, also fill in the widget field.",
            transaction_context(transactions)
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "The textual chat reply" },
                "widget": {
                    "type": "object",
                    "description": "Optional. A small card complementing the reply.",
                    "properties": {
                        "kind": { "type": "string", "enum": ["stat", "alert", "saving_tip"] },
                        "title": { "type": "string" },
                        "value": { "type": "string", "description": "e.g. R$ 450,00 or +15%" },
                        "description": { "type": "string" },
                        "color": { "type": "string", "enum": ["emerald", "red", "blue", "amber"] }
                    },
                    "required": ["kind", "title", "description"]
                }
            },
            "required": ["text"]
        });

        let reply = match self.generate_json(prompt, schema).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!("Chat request failed: {error}");
                return ChatReply {
                    text: CHAT_FALLBACK.to_string(),
                    widget: None,
                };
            }
        };

        match serde_json::from_str(&reply) {
            Ok(chat_reply) => chat_reply,
            Err(error) => {
                tracing::warn!("Chat reply did not match the expected schema: {error}");
                ChatReply {
                    text: CHAT_FALLBACK.to_string(),
                    widget: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod client_tests {
    use time::macros::date;

    use crate::transaction::{Transaction, TransactionKind};

    use super::{AssistantClient, ChatReply, Forecast, ParsedEntry, RiskLevel, WidgetKind};

    #[test]
    fn new_trims_trailing_slash_from_base_url() {
        let client = AssistantClient::new("https://api.example.com/", "key", "some-model");

        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(client.model, "some-model");
    }

    #[test]
    fn parsed_entry_deserializes() {
        let json = r#"{
            "amount": 45.90,
            "description": "Uber para Aeroporto",
            "category": "Transporte",
            "date": "2023-10-18",
            "kind": "expense"
        }"#;

        let entry: ParsedEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.amount, 45.90);
        assert_eq!(entry.date, date!(2023 - 10 - 18));
        assert_eq!(entry.kind, TransactionKind::Expense);
    }

    #[test]
    fn forecast_deserializes_without_optional_fields() {
        let json = r#"{
            "predicted_total_next_month": 1016.40,
            "risk_level": "medium"
        }"#;

        let forecast: Forecast = serde_json::from_str(json).unwrap();

        assert_eq!(forecast.risk_level, RiskLevel::Medium);
        assert!(forecast.alerts.is_empty());
        assert!(forecast.suggestions.is_empty());
    }

    #[test]
    fn forecast_deserializes_alerts_and_suggestions() {
        let json = r#"{
            "predicted_total_next_month": 1016.40,
            "risk_level": "high",
            "alerts": [
                {"title": "Delivery", "message": "Spending is up", "severity": "warning"}
            ],
            "suggestions": ["Cook at home", "Use public transport", "Cancel unused subscriptions"]
        }"#;

        let forecast: Forecast = serde_json::from_str(json).unwrap();

        assert_eq!(forecast.alerts.len(), 1);
        assert_eq!(forecast.suggestions.len(), 3);
    }

    #[test]
    fn chat_reply_deserializes_with_widget() {
        let json = r#"{
            "text": "You can save about R$ 1,200 this month.",
            "widget": {
                "kind": "saving_tip",
                "title": "Monthly headroom",
                "value": "R$ 1.200,00",
                "description": "Income minus expenses this month.",
                "color": "emerald"
            }
        }"#;

        let reply: ChatReply = serde_json::from_str(json).unwrap();

        let widget = reply.widget.unwrap();
        assert_eq!(widget.kind, WidgetKind::SavingTip);
        assert_eq!(widget.value.as_deref(), Some("R$ 1.200,00"));
    }

    #[test]
    fn chat_reply_deserializes_without_widget() {
        let reply: ChatReply = serde_json::from_str(r#"{"text": "Hello!"}"#).unwrap();

        assert!(reply.widget.is_none());
    }

    #[test]
    fn transaction_context_includes_direction_markers() {
        let transactions = vec![
            Transaction {
                id: 1,
                description: "Salário Mensal".to_string(),
                amount: 4500.0,
                category: "Salário".to_string(),
                date: date!(2023 - 10 - 05),
                kind: TransactionKind::Income,
                ai_generated: false,
            },
            Transaction {
                id: 2,
                description: "Cinema com amigos".to_string(),
                amount: 120.0,
                category: "Lazer".to_string(),
                date: date!(2023 - 10 - 20),
                kind: TransactionKind::Expense,
                ai_generated: false,
            },
        ];

        let context = super::transaction_context(&transactions);

        assert!(context.contains("(INCOME) Salário Mensal: R$ 4500.00"));
        assert!(context.contains("(EXPENSE) Cinema com amigos: R$ 120.00"));
        assert_eq!(context.lines().count(), 2);
    }
}
