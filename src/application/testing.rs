//! Test doubles shared by the router and command tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::domain::traits::{ChatProvider, ForecastProvider};
use crate::domain::types::{ForecastMetrics, ForecastReport, MessageId, View};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send(View),
    Edit(MessageId, View),
    Delete(MessageId),
}

/// A `ChatProvider` that records every call.
pub struct RecordingChat {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    fail_edits: bool,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(100),
            fail_edits: false,
        }
    }

    pub fn failing_edits(mut self) -> Self {
        self.fail_edits = true;
        self
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn sent(&self) -> Vec<View> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub async fn edited(&self) -> Vec<MessageId> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub async fn deleted(&self) -> Vec<MessageId> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Every view drawn, sent or edited, in order.
    pub async fn views(&self) -> Vec<View> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(v) | Call::Edit(_, v) => Some(v),
                Call::Delete(_) => None,
            })
            .collect()
    }

    pub async fn last_view(&self) -> Option<View> {
        self.views().await.pop()
    }
}

#[async_trait]
impl ChatProvider for RecordingChat {
    async fn send_view(&self, view: &View) -> Result<MessageId, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.calls.lock().await.push(Call::Send(view.clone()));
        Ok(id)
    }

    async fn edit_view(&self, message_id: &str, view: &View) -> Result<MessageId, String> {
        if self.fail_edits {
            return Err("message can't be edited".to_string());
        }
        self.calls
            .lock()
            .await
            .push(Call::Edit(message_id.to_string(), view.clone()));
        Ok(message_id.to_string())
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), String> {
        self.calls.lock().await.push(Call::Delete(message_id.to_string()));
        Ok(())
    }
}

/// A `ForecastProvider` returning a canned report, or failing for ticker `FAIL`.
pub struct StubForecast;

#[async_trait]
impl ForecastProvider for StubForecast {
    async fn forecast(&self, ticker: &str, amount: f64) -> Result<ForecastReport, String> {
        if ticker == "FAIL" {
            return Err("no data for ticker FAIL".to_string());
        }
        Ok(ForecastReport {
            ticker: ticker.to_string(),
            model: "RandomForest".to_string(),
            metrics: ForecastMetrics {
                rmse: 1.25,
                mape: 0.031,
                mae: 0.9,
            },
            forecast: vec![101.0, 102.5, 103.0],
            last_close: 100.0,
            profit: amount * 0.1,
            profit_percentage: 10.0,
            summary: "Buy on day 1, sell on day 3.".to_string(),
            chart_url: Some("https://charts.example/aapl.png".to_string()),
            chart: Some(b"\x89PNG".to_vec()),
        })
    }
}
