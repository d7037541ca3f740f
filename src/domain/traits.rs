//! # Domain Traits
//!
//! Abstract interfaces for the collaborators around the router (chat transport, forecasting).
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;

use crate::domain::types::{ForecastReport, MessageId, View};

/// Abstract interface for a Chat Provider bound to one conversation (e.g., Telegram, Console).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a new message rendering `view`
    async fn send_view(&self, view: &View) -> Result<MessageId, String>;

    /// Replace the content of an existing message
    async fn edit_view(&self, message_id: &str, view: &View) -> Result<MessageId, String>;

    /// Delete a message
    async fn delete_message(&self, message_id: &str) -> Result<(), String>;
}

/// Abstract interface for the forecasting pipeline.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Run a forecast for `ticker`, simulating an investment of `amount`.
    async fn forecast(&self, ticker: &str, amount: f64) -> Result<ForecastReport, String>;
}
