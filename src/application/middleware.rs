//! # Middleware Pipeline
//!
//! Observers run, in order, before every handler with the handler's own context.
//! They can log and record but cannot block, redirect or short-circuit dispatch:
//! a failing middleware is logged and the pipeline moves on.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::context::RequestContext;

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn observe(&self, ctx: &RequestContext) -> Result<()>;
}

/// Adapter for synchronous closures.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

#[allow(dead_code)]
pub fn middleware_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Middleware>
where
    F: Fn(&RequestContext) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware {
        name: name.into(),
        f,
    })
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&RequestContext) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn observe(&self, ctx: &RequestContext) -> Result<()> {
        (self.f)(ctx)
    }
}

#[derive(Default, Clone)]
pub struct Pipeline {
    entries: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.entries.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Runs every middleware. Returns how many failed.
    pub async fn run(&self, ctx: &RequestContext) -> usize {
        let mut failures = 0;
        for middleware in &self.entries {
            if let Err(e) = middleware.observe(ctx).await {
                failures += 1;
                tracing::error!(
                    "Middleware '{}' failed on {}: {:#}",
                    middleware.name(),
                    ctx.path(),
                    e
                );
            }
        }
        failures
    }
}

/// Logs every dispatched request.
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    fn name(&self) -> &str {
        "request-logger"
    }

    async fn observe(&self, ctx: &RequestContext) -> Result<()> {
        tracing::info!(
            "Router dispatching path='{}' template='{}' params={:?} user='{}' chat='{}'",
            ctx.path(),
            ctx.template(),
            ctx.params(),
            ctx.user_id(),
            ctx.chat_id()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeenUser {
    pub first_seen: DateTime<Local>,
    pub last_seen: DateTime<Local>,
    /// Requests dispatched for this user, redirects included.
    pub requests: u64,
}

/// Remembers when each user was first and last active.
#[derive(Default, Clone)]
pub struct UserTracker {
    seen: Arc<Mutex<HashMap<String, SeenUser>>>,
}

impl UserTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_seen(&self, user_id: &str) -> Option<SeenUser> {
        self.seen.lock().await.get(user_id).cloned()
    }
}

#[async_trait]
impl Middleware for UserTracker {
    fn name(&self) -> &str {
        "user-tracker"
    }

    async fn observe(&self, ctx: &RequestContext) -> Result<()> {
        let now = Local::now();
        let mut guard = self.seen.lock().await;
        let entry = guard.entry(ctx.user_id().to_string()).or_insert_with(|| {
            tracing::info!("First request from user {} in chat {}", ctx.user_id(), ctx.chat_id());
            SeenUser {
                first_seen: now,
                last_seen: now,
                requests: 0,
            }
        });
        entry.last_seen = now;
        entry.requests += 1;
        Ok(())
    }
}
