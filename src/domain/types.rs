//! # Domain Types
//!
//! View model handed to the presentation layer, form fields, and the data exchanged
//! with the forecast and activity collaborators.

use serde::{Deserialize, Serialize};

/// Identifier of an outbound message, as assigned by the chat transport.
pub type MessageId = String;

/// How an option button behaves when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// Sends `target` back to the router as a callback path.
    #[default]
    Callback,
    OpenUrl,
    WebApp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOption {
    pub label: String,
    pub target: String,
    #[serde(default)]
    pub kind: OptionKind,
}

impl ViewOption {
    pub fn link(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
            kind: OptionKind::Callback,
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: url.into(),
            kind: OptionKind::OpenUrl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Choice,
}

/// A single question of a multi-step form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub prompt: String,
    pub placeholder: Option<String>,
    pub choices: Option<Vec<String>>,
    /// Captured answer; unset until the step is submitted.
    pub value: Option<String>,
    /// Message that displayed this step, kept for later edit/delete.
    pub message_id: Option<MessageId>,
}

impl FormField {
    pub fn text(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Text,
            prompt: prompt.into(),
            placeholder: None,
            choices: None,
            value: None,
            message_id: None,
        }
    }

    #[allow(dead_code)]
    pub fn choice<I, S>(name: impl Into<String>, prompt: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            field_type: FieldType::Choice,
            prompt: prompt.into(),
            placeholder: None,
            choices: Some(choices.into_iter().map(Into::into).collect()),
            value: None,
            message_id: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Whether `value` is an acceptable answer for this field.
    pub fn accepts(&self, value: &str) -> bool {
        match (&self.field_type, &self.choices) {
            (_, _) if value.trim().is_empty() => false,
            (FieldType::Choice, Some(choices)) => choices.iter().any(|c| c == value),
            _ => true,
        }
    }
}

/// Form fields as shown to the renderer, with the step currently awaited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub fields: Vec<FormField>,
    pub step: usize,
}

impl FormView {
    pub fn current_field(&self) -> Option<&FormField> {
        self.fields.get(self.step)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Image {
    Url(String),
    Bytes(Vec<u8>),
}

/// Everything the presentation layer needs to draw one message.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct View {
    pub title: String,
    pub text: String,
    pub image: Option<Image>,
    pub options: Vec<ViewOption>,
    pub form: Option<FormView>,
}

impl View {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn option(mut self, option: ViewOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn options(mut self, options: impl IntoIterator<Item = ViewOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn image(mut self, image: Image) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mape: f64,
    #[serde(default)]
    pub mae: f64,
}

/// Result of one forecast run, as reported by the forecast service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub ticker: String,
    pub model: String,
    pub metrics: ForecastMetrics,
    #[serde(default)]
    pub forecast: Vec<f64>,
    pub last_close: f64,
    pub profit: f64,
    pub profit_percentage: f64,
    pub summary: String,
    /// Chart rendered by the service, fetched from there as PNG.
    #[serde(default)]
    pub chart_url: Option<String>,
    #[serde(skip)]
    pub chart: Option<Vec<u8>>,
}

/// One line of the activity log, written per completed forecast request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: String,
    pub user_id: String,
    pub ticker: String,
    pub investment_amount: f64,
    pub best_model: String,
    pub rmse: f64,
    pub mape: f64,
    pub profit: f64,
    pub profit_percentage: f64,
    /// Seconds spent serving the request.
    pub processing_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_field_accepts_only_listed_values() {
        let field = FormField::choice("period", "Pick a period", ["7", "30"]);
        assert!(field.accepts("7"));
        assert!(!field.accepts("90"));
        assert!(!field.accepts(""));
    }

    #[test]
    fn test_text_field_rejects_blank() {
        let field = FormField::text("ticker", "Ticker?").with_placeholder("AAPL");
        assert!(field.accepts("MSFT"));
        assert!(!field.accepts("   "));
        assert_eq!(field.placeholder.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_report_parses_without_optional_fields() {
        let json = r#"{
            "ticker": "AAPL", "model": "RandomForest",
            "metrics": {"rmse": 1.5, "mape": 0.02},
            "last_close": 190.0, "profit": 42.0, "profit_percentage": 4.2,
            "summary": "Buy on dips"
        }"#;
        let report: ForecastReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.metrics.mae, 0.0);
        assert!(report.forecast.is_empty());
        assert!(report.chart_url.is_none());
        assert!(report.chart.is_none());
    }
}
