//! # Stats Command
//!
//! Handles `/stats`: the user's forecast history from the activity log.

use anyhow::Result;
use std::sync::Arc;

use crate::application::context::RequestContext;
use crate::application::render::DeferredRender;
use crate::domain::types::{View, ViewOption};
use crate::interface::commands::AppServices;
use crate::strings::messages;

pub async fn handle_stats(ctx: RequestContext, services: Arc<AppServices>) -> Result<DeferredRender> {
    let mut text = match services.activity.summary(ctx.user_id()).await {
        Some(summary) => messages::stats_body(summary.requests, &summary.last_ticker, summary.total_profit),
        None => messages::STATS_EMPTY.to_string(),
    };
    if let Some(seen) = services.tracker.last_seen(ctx.user_id()).await {
        let since = seen.first_seen.format("%Y-%m-%d %H:%M").to_string();
        text = format!("{text}\n\n{}", messages::stats_activity(&since, seen.requests));
    }
    Ok(DeferredRender::view(
        View::new(messages::STATS_TITLE, text).option(ViewOption::link(messages::BACK_LABEL, "/")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::{InboundEvent, InboundKind};
    use crate::application::middleware::{Middleware, UserTracker};
    use crate::application::testing::StubForecast;
    use crate::domain::config::AppConfig;
    use crate::infrastructure::activity::ActivityLog;

    #[tokio::test]
    async fn test_stats_show_tracked_activity() {
        let dir = tempfile::tempdir().unwrap();
        let (activity, _writer) = ActivityLog::spawn(dir.path().join("activity.jsonl")).unwrap();
        let services = Arc::new(AppServices {
            forecast: Arc::new(StubForecast),
            activity,
            tracker: UserTracker::new(),
            config: AppConfig::default(),
        });
        let event = InboundEvent::new("42", "7", InboundKind::Command, "/stats");
        let ctx = RequestContext::new(event, "/stats", "/stats", Default::default());
        services.tracker.observe(&ctx).await.unwrap();

        let render = handle_stats(ctx, services).await.unwrap();
        let view = render.to_view().unwrap();
        assert!(view.text.starts_with(messages::STATS_EMPTY));
        assert!(view.text.contains("Requests sent: 1"));
    }
}
