//! # Help Command
//!
//! Handles `/help`.

use anyhow::Result;
use std::sync::Arc;

use crate::application::context::RequestContext;
use crate::application::render::DeferredRender;
use crate::domain::types::{View, ViewOption};
use crate::interface::commands::AppServices;
use crate::strings::help;

pub async fn handle_help(_ctx: RequestContext, services: Arc<AppServices>) -> Result<DeferredRender> {
    let forecast = &services.config.forecast;
    Ok(DeferredRender::view(
        View::new(help::TITLE, help::main_text(forecast.historical_years, forecast.forecast_days))
            .option(ViewOption::link(help::START_LABEL, "/forecast")),
    ))
}
