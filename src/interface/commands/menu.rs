//! # Menu Command
//!
//! Handles `/` (and Telegram's `/start`). Shows the main navigation.

use anyhow::Result;

use crate::application::context::RequestContext;
use crate::application::render::DeferredRender;
use crate::domain::types::{View, ViewOption};
use crate::strings::messages;

pub fn menu_view() -> View {
    View::new(messages::MENU_TITLE, messages::MENU_TEXT).options([
        ViewOption::link(messages::MENU_FORECAST, "/forecast"),
        ViewOption::link(messages::MENU_STATS, "/stats"),
        ViewOption::link(messages::MENU_HELP, "/help"),
    ])
}

pub async fn handle_menu(_ctx: RequestContext) -> Result<DeferredRender> {
    Ok(DeferredRender::view(menu_view()))
}
