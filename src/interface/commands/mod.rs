//! # Command Handlers
//!
//! Route handlers of the stock forecast bot and their registration with the router.

pub mod forecast;
pub mod help;
pub mod menu;
pub mod stats;

use std::sync::Arc;

use crate::application::context::RequestContext;
use crate::application::middleware::UserTracker;
use crate::application::router::{RouterBuilder, handler_fn};
use crate::domain::config::AppConfig;
use crate::domain::error::RouterError;
use crate::domain::traits::ForecastProvider;
use crate::infrastructure::activity::ActivityLog;

/// Collaborators shared by the handlers.
pub struct AppServices {
    pub forecast: Arc<dyn ForecastProvider>,
    pub activity: ActivityLog,
    /// The tracker middleware registered with the router, read back by `/stats`.
    pub tracker: UserTracker,
    pub config: AppConfig,
}

/// Registers every route. Order matters: the first matching template wins.
pub fn register(builder: RouterBuilder, services: Arc<AppServices>) -> Result<RouterBuilder, RouterError> {
    let for_run = services.clone();
    let for_stats = services.clone();
    let for_help = services;

    builder
        .route("/", handler_fn("menu", menu::handle_menu))?
        .route("/forecast", handler_fn("forecast_form", forecast::handle_start))?
        .route("/forecast/process", handler_fn("forecast_process", forecast::handle_process))?
        .route(
            "/forecast/run/{ticker}/{amount}",
            handler_fn("forecast_run", move |ctx: RequestContext| {
                forecast::handle_run(ctx, for_run.clone())
            }),
        )?
        .route(
            "/stats",
            handler_fn("stats", move |ctx: RequestContext| stats::handle_stats(ctx, for_stats.clone())),
        )?
        .route(
            "/help",
            handler_fn("help", move |ctx: RequestContext| help::handle_help(ctx, for_help.clone())),
        )
}
