//! # Forecast Command
//!
//! The forecast flow:
//! - `/forecast` opens a two-step form (ticker, amount).
//! - `/forecast/process` receives the answers, validates them and shows a
//!   "processing" message, then redirects to the run route.
//! - `/forecast/run/{ticker}/{amount}` runs the forecast, records the request and
//!   replaces the processing message with the result and its chart.

use anyhow::Result;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::application::context::RequestContext;
use crate::application::forms::FormDescriptor;
use crate::application::render::DeferredRender;
use crate::domain::types::{ActivityRecord, FormField, Image, View, ViewOption};
use crate::interface::commands::AppServices;
use crate::strings::messages;

static TICKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9.\-]{0,9}$").unwrap_or_else(|e| unreachable!("ticker pattern: {e}"))
});

/// Normalized ticker, or `None` when `raw` cannot be one.
pub fn parse_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().to_uppercase();
    TICKER.is_match(&ticker).then_some(ticker)
}

/// Positive, finite investment amount. Accepts `1000`, `1 000`, `$1000.50`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

pub fn forecast_form() -> FormDescriptor {
    FormDescriptor::new(
        messages::FORECAST_FORM_TITLE,
        messages::FORECAST_FORM_TEXT,
        "/forecast/process",
    )
    .field(FormField::text("ticker", messages::TICKER_PROMPT).with_placeholder(messages::TICKER_PLACEHOLDER))
    .field(FormField::text("amount", messages::AMOUNT_PROMPT).with_placeholder(messages::AMOUNT_PLACEHOLDER))
}

fn retry_view(text: String) -> View {
    View::new(messages::ERROR_TITLE, text).options([
        ViewOption::link(messages::NEW_FORECAST_LABEL, "/forecast"),
        ViewOption::link(messages::MENU_LABEL, "/"),
    ])
}

pub async fn handle_start(_ctx: RequestContext) -> Result<DeferredRender> {
    Ok(DeferredRender::form(forecast_form()))
}

pub async fn handle_process(ctx: RequestContext) -> Result<DeferredRender> {
    let raw_ticker = ctx.form_value("ticker").unwrap_or_default();
    let raw_amount = ctx.form_value("amount").unwrap_or_default();

    let Some(ticker) = parse_ticker(raw_ticker) else {
        tracing::warn!("User {} entered invalid ticker '{}'", ctx.user_id(), raw_ticker);
        return Ok(DeferredRender::view(retry_view(messages::invalid_ticker(raw_ticker))));
    };
    let Some(amount) = parse_amount(raw_amount) else {
        tracing::warn!("User {} entered invalid amount '{}'", ctx.user_id(), raw_amount);
        return Ok(DeferredRender::view(retry_view(messages::invalid_amount(raw_amount))));
    };

    Ok(
        DeferredRender::view(View::new(messages::PROCESSING_TITLE, messages::PROCESSING_TEXT))
            .then(format!("/forecast/run/{ticker}/{amount}")),
    )
}

pub async fn handle_run(ctx: RequestContext, services: Arc<AppServices>) -> Result<DeferredRender> {
    let raw_ticker = ctx.param_or("ticker", "");
    let raw_amount = ctx.param_or("amount", "");
    let Some(ticker) = parse_ticker(raw_ticker) else {
        return Ok(DeferredRender::view(retry_view(messages::invalid_ticker(raw_ticker))));
    };
    let Some(amount) = parse_amount(raw_amount) else {
        return Ok(DeferredRender::view(retry_view(messages::invalid_amount(raw_amount))));
    };

    let started = Instant::now();
    let report = match services.forecast.forecast(&ticker, amount).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Forecast for {} failed: {}", ticker, e);
            return Ok(DeferredRender::view(retry_view(messages::forecast_failed(&e))));
        }
    };
    let processing_time = started.elapsed().as_secs_f64();
    tracing::info!(
        "Forecast for {} done in {:.1}s with {}",
        ticker,
        processing_time,
        report.model
    );

    services
        .activity
        .record(ActivityRecord {
            timestamp: chrono::Local::now().to_rfc3339(),
            user_id: ctx.user_id().to_string(),
            ticker: ticker.clone(),
            investment_amount: amount,
            best_model: report.model.clone(),
            rmse: report.metrics.rmse,
            mape: report.metrics.mape,
            profit: report.profit,
            profit_percentage: report.profit_percentage,
            processing_time,
        })
        .await;

    let view = View::new(
        messages::forecast_title(&ticker, &report.model),
        messages::forecast_body(
            &report.summary,
            report.last_close,
            report.profit,
            report.profit_percentage,
            report.metrics.rmse,
            report.metrics.mape,
        ),
    )
    .options([
        ViewOption::link(messages::NEW_FORECAST_LABEL, "/forecast"),
        ViewOption::link(messages::MENU_LABEL, "/"),
        ViewOption::url(messages::QUOTE_LABEL, messages::quote_url(&ticker)),
    ]);

    // A photo cannot be edited into the text-only processing message.
    match (report.chart, report.chart_url) {
        (Some(png), _) => Ok(DeferredRender::view(view.image(Image::Bytes(png))).replace_current()),
        (None, Some(url)) => Ok(DeferredRender::view(view.image(Image::Url(url))).replace_current()),
        (None, None) => Ok(DeferredRender::view(view)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::{InboundEvent, InboundKind};
    use crate::application::middleware::UserTracker;
    use crate::application::render::RenderIntent;
    use crate::application::router::{CommandRouter, RouterBuilder};
    use crate::application::testing::{RecordingChat, StubForecast};
    use crate::domain::config::AppConfig;
    use crate::domain::types::OptionKind;
    use crate::infrastructure::activity::ActivityLog;
    use crate::interface::commands::register;

    fn services(dir: &tempfile::TempDir) -> Arc<AppServices> {
        let (activity, _writer) = ActivityLog::spawn(dir.path().join("activity.jsonl")).unwrap();
        Arc::new(AppServices {
            forecast: Arc::new(StubForecast),
            activity,
            tracker: UserTracker::new(),
            config: AppConfig::default(),
        })
    }

    fn router(services: Arc<AppServices>) -> CommandRouter {
        register(RouterBuilder::default(), services).unwrap().build()
    }

    fn typed(text: &str) -> InboundEvent {
        InboundEvent::new("42", "7", InboundKind::Text, text)
    }

    #[test]
    fn test_ticker_validation() {
        assert_eq!(parse_ticker(" aapl ").as_deref(), Some("AAPL"));
        assert_eq!(parse_ticker("BRK.B").as_deref(), Some("BRK.B"));
        assert!(parse_ticker("").is_none());
        assert!(parse_ticker("not a ticker").is_none());
        assert!(parse_ticker("1ABC").is_none());
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(parse_amount("1000"), Some(1000.0));
        assert_eq!(parse_amount("$1 000.50"), Some(1000.5));
        assert!(parse_amount("0").is_none());
        assert!(parse_amount("-5").is_none());
        assert!(parse_amount("lots").is_none());
        assert!(parse_amount("inf").is_none());
    }

    #[tokio::test]
    async fn test_form_has_ticker_and_amount() {
        let event = InboundEvent::new("42", "7", InboundKind::Command, "/forecast");
        let ctx = RequestContext::new(event, "/forecast", "/forecast", Default::default());
        let render = handle_start(ctx).await.unwrap();

        let RenderIntent::Form(form) = render.intent else {
            panic!("expected a form");
        };
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ticker", "amount"]);
        assert_eq!(form.completion_route, "/forecast/process");
    }

    #[tokio::test]
    async fn test_full_forecast_flow() {
        let dir = tempfile::tempdir().unwrap();
        let services = services(&dir);
        let router = router(services.clone());
        let chat = RecordingChat::new();

        router
            .handle(&chat, InboundEvent::new("42", "7", InboundKind::Command, "/forecast"))
            .await
            .unwrap();
        router.handle(&chat, typed("aapl")).await.unwrap();
        router.handle(&chat, typed("1000")).await.unwrap();

        let views = chat.views().await;
        let processing = views
            .iter()
            .position(|v| v.title == messages::PROCESSING_TITLE)
            .expect("processing message shown");
        let result = views.last().unwrap();
        assert!(processing < views.len() - 1);
        assert!(result.title.contains("AAPL"));
        assert!(result.title.contains("RandomForest"));
        assert_eq!(result.image, Some(Image::Bytes(b"\x89PNG".to_vec())));
        assert!(result.options.iter().any(|o| o.kind == OptionKind::OpenUrl));

        // the chart replaces the processing message instead of editing it
        assert_eq!(chat.deleted().await.len(), 1);
        assert_eq!(chat.sent().await.last(), Some(result));

        let summary = services.activity.summary("7").await.unwrap();
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.last_ticker, "AAPL");
        assert_eq!(summary.total_profit, 100.0);
    }

    #[tokio::test]
    async fn test_invalid_amount_offers_retry() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(services(&dir));
        let chat = RecordingChat::new();

        router
            .handle(&chat, InboundEvent::new("42", "7", InboundKind::Command, "/forecast"))
            .await
            .unwrap();
        router.handle(&chat, typed("MSFT")).await.unwrap();
        router.handle(&chat, typed("a lot")).await.unwrap();

        let view = chat.last_view().await.unwrap();
        assert_eq!(view.title, messages::ERROR_TITLE);
        assert_eq!(view.options[0].target, "/forecast");
    }

    #[tokio::test]
    async fn test_run_route_names_the_bad_part() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(services(&dir));
        let chat = RecordingChat::new();
        let run = |path: &str| InboundEvent::new("42", "7", InboundKind::Command, path);

        router.handle(&chat, run("/forecast/run/AAPL/zero")).await.unwrap();
        assert_eq!(chat.last_view().await.unwrap().text, messages::invalid_amount("zero"));

        router.handle(&chat, run("/forecast/run/1BAD/100")).await.unwrap();
        assert_eq!(chat.last_view().await.unwrap().text, messages::invalid_ticker("1BAD"));
    }

    #[tokio::test]
    async fn test_service_failure_is_shown() {
        let dir = tempfile::tempdir().unwrap();
        let services = services(&dir);
        let router = router(services.clone());
        let chat = RecordingChat::new();

        router
            .handle(&chat, InboundEvent::new("42", "7", InboundKind::Command, "/forecast/run/FAIL/100"))
            .await
            .unwrap();

        let view = chat.last_view().await.unwrap();
        assert!(view.text.contains("no data for ticker FAIL"));
        assert!(services.activity.summary("7").await.is_none());
    }
}
