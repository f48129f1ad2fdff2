//! Alert fragments for displaying success and error messages to users.
//!
//! Alerts are returned as HTML fragments so HTMX forms can swap them in
//! next to the element that triggered the request.

use maud::{Markup, Render, html};

/// Alert message types for styling
#[derive(Debug, Clone)]
pub enum AlertType {
    /// A green alert confirming an action.
    Success,
    /// A red alert explaining a failure.
    Error,
}

/// Renders alert messages with appropriate styling
pub struct AlertTemplate<'a> {
    alert_type: AlertType,
    message: &'a str,
    details: &'a str,
}

impl<'a> AlertTemplate<'a> {
    /// Create a new success alert
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message,
            details,
        }
    }

    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }
}

impl Render for AlertTemplate<'_> {
    fn render(&self) -> Markup {
        let (container_style, icon) = match self.alert_type {
            AlertType::Success => (
                "p-4 mb-4 text-sm rounded-lg bg-green-50 text-green-800 \
                dark:bg-gray-800 dark:text-green-400",
                "✓",
            ),
            AlertType::Error => (
                "p-4 mb-4 text-sm rounded-lg bg-red-50 text-red-800 \
                dark:bg-gray-800 dark:text-red-400",
                "✗",
            ),
        };

        html! {
            div class=(container_style) role="alert"
            {
                span class="font-medium" { (icon) " " (self.message) }

                @if !self.details.is_empty() {
                    p { (self.details) }
                }
            }
        }
    }
}

#[cfg(test)]
mod alert_tests {
    use super::AlertTemplate;
    use maud::Render;

    #[test]
    fn error_alert_contains_message_and_details() {
        let markup = AlertTemplate::error("Something failed", "Try again later.").render();
        let rendered = markup.into_string();

        assert!(rendered.contains("Something failed"));
        assert!(rendered.contains("Try again later."));
    }

    #[test]
    fn success_alert_omits_empty_details() {
        let markup = AlertTemplate::success("Saved", "").render();
        let rendered = markup.into_string();

        assert!(rendered.contains("Saved"));
        assert!(!rendered.contains("<p>"));
    }
}
