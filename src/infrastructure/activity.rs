//! # Activity Log
//!
//! Append-only record of completed forecasts, one JSON object per line.
//! Handlers hand records to an unbounded channel; a background task owns the file so a
//! slow disk never delays a reply. A per-user summary is kept in memory for `/stats`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::domain::types::ActivityRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSummary {
    pub requests: u64,
    pub last_ticker: String,
    pub total_profit: f64,
}

#[derive(Clone)]
pub struct ActivityLog {
    tx: mpsc::UnboundedSender<ActivityRecord>,
    summaries: Arc<Mutex<HashMap<String, UserSummary>>>,
}

impl ActivityLog {
    /// Starts the writer task appending to `path`. The task ends once every clone of
    /// the log has been dropped and the queue is drained.
    pub fn spawn(path: PathBuf) -> Result<(Self, JoinHandle<()>)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create activity log directory {}", parent.display()))?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_records(path, rx));
        let log = Self {
            tx,
            summaries: Arc::new(Mutex::new(HashMap::new())),
        };
        Ok((log, handle))
    }

    pub async fn record(&self, record: ActivityRecord) {
        {
            let mut summaries = self.summaries.lock().await;
            let summary = summaries.entry(record.user_id.clone()).or_default();
            summary.requests += 1;
            summary.last_ticker = record.ticker.clone();
            summary.total_profit += record.profit;
        }
        if self.tx.send(record).is_err() {
            tracing::error!("Activity writer is gone, record dropped");
        }
    }

    pub async fn summary(&self, user_id: &str) -> Option<UserSummary> {
        self.summaries.lock().await.get(user_id).cloned()
    }
}

async fn write_records(path: PathBuf, mut rx: mpsc::UnboundedReceiver<ActivityRecord>) {
    while let Some(record) = rx.recv().await {
        if let Err(e) = append(&path, &record).await {
            tracing::error!("Failed to write activity record to {}: {:#}", path.display(), e);
        }
    }
    tracing::debug!("Activity writer for {} stopped", path.display());
}

async fn append(path: &Path, record: &ActivityRecord) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, ticker: &str, profit: f64) -> ActivityRecord {
        ActivityRecord {
            timestamp: "2024-01-01T00:00:00".to_string(),
            user_id: user.to_string(),
            ticker: ticker.to_string(),
            investment_amount: 1000.0,
            best_model: "RandomForest".to_string(),
            rmse: 1.0,
            mape: 0.02,
            profit,
            profit_percentage: profit / 10.0,
            processing_time: 0.5,
        }
    }

    #[tokio::test]
    async fn test_records_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activity.jsonl");
        let (log, writer) = ActivityLog::spawn(path.clone()).unwrap();

        log.record(record("1", "AAPL", 10.0)).await;
        log.record(record("2", "MSFT", -5.0)).await;
        drop(log);
        writer.await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<ActivityRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].ticker, "AAPL");
        assert_eq!(lines[1].profit, -5.0);
    }

    #[tokio::test]
    async fn test_summary_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let (log, _writer) = ActivityLog::spawn(dir.path().join("a.jsonl")).unwrap();

        log.record(record("1", "AAPL", 10.0)).await;
        log.record(record("1", "TSLA", 2.5)).await;

        let summary = log.summary("1").await.unwrap();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.last_ticker, "TSLA");
        assert_eq!(summary.total_profit, 12.5);
        assert!(log.summary("2").await.is_none());
    }
}
