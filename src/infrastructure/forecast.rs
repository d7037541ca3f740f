//! # Forecast Service Client
//!
//! Implements `ForecastProvider` against the model service over HTTP.
//! The service loads historical prices, trains its models, picks the best one and
//! returns the forecast together with the trading simulation for the amount.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::domain::config::{ForecastConfig, ForecastServiceConfig};
use crate::domain::traits::ForecastProvider;
use crate::domain::types::ForecastReport;

#[derive(Debug, Serialize)]
struct ForecastRequest<'a> {
    ticker: &'a str,
    amount: f64,
    historical_years: u32,
    forecast_days: u32,
}

pub struct HttpForecastService {
    client: Client,
    endpoint: String,
    historical_years: u32,
    forecast_days: u32,
}

impl HttpForecastService {
    pub fn new(service: &ForecastServiceConfig, forecast: &ForecastConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(service.timeout))
            .build()
            .context("Failed to create forecast HTTP client")?;
        Ok(Self {
            client,
            endpoint: service.endpoint.trim_end_matches('/').to_string(),
            historical_years: forecast.historical_years,
            forecast_days: forecast.forecast_days,
        })
    }

    fn url(&self) -> String {
        format!("{}/forecast", self.endpoint)
    }

    /// Absolute chart location. The service may answer with a path of its own.
    fn chart_url(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/{}", self.endpoint, location.trim_start_matches('/'))
        }
    }

    async fn fetch_chart(&self, location: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.chart_url(location))
            .send()
            .await
            .context("Chart request failed")?
            .error_for_status()
            .context("Chart not available")?;
        Ok(response.bytes().await.context("Failed to read chart")?.to_vec())
    }
}

/// Best-effort extraction of a readable message from an error body.
fn error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("detail")
        .or_else(|| json.get("error").and_then(|e| e.get("message").or(Some(e))))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl ForecastProvider for HttpForecastService {
    async fn forecast(&self, ticker: &str, amount: f64) -> Result<ForecastReport, String> {
        let request = ForecastRequest {
            ticker,
            amount,
            historical_years: self.historical_years,
            forecast_days: self.forecast_days,
        };
        tracing::info!("Requesting forecast for {} ({} days)", ticker, self.forecast_days);

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Forecast service unreachable: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(error_message(&body).unwrap_or_else(|| format!("HTTP {}: {}", status, body)));
        }

        let mut report = response
            .json::<ForecastReport>()
            .await
            .map_err(|e| format!("Invalid forecast response: {}", e))?;

        if let Some(location) = report.chart_url.clone() {
            match self.fetch_chart(&location).await {
                Ok(png) => report.chart = Some(png),
                Err(e) => tracing::warn!("Chart for {} unavailable, sending text only: {:#}", ticker, e),
            }
        }
        Ok(report)
    }
}
