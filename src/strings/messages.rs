//! # Messages
//!
//! Constant strings and format functions for user-facing messages.

pub const ERROR_TITLE: &str = "⚠️ Error";
pub const BACK_LABEL: &str = "⬅️ Back";
pub const MENU_LABEL: &str = "🏠 Main menu";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command.";
pub const FORM_EXPIRED: &str = "This form is no longer active. Start again from the menu.";
pub const GENERIC_ERROR: &str = "Something went wrong while handling your request. Please try again.";

// Menu
pub const MENU_TITLE: &str = "📊 Stock Forecast Bot";
pub const MENU_TEXT: &str = "Welcome! I can analyse a stock and build a price forecast for you.";
pub const MENU_FORECAST: &str = "📈 Get a stock forecast";
pub const MENU_STATS: &str = "📊 My statistics";
pub const MENU_HELP: &str = "ℹ️ Help";

// Forecast
pub const FORECAST_FORM_TITLE: &str = "Ticker input";
pub const FORECAST_FORM_TEXT: &str = "Please enter the ticker of the company you want to analyse.";
pub const TICKER_PROMPT: &str = "Enter the company ticker";
pub const TICKER_PLACEHOLDER: &str = "(e.g. AAPL, MSFT, GOOGL)";
pub const AMOUNT_PROMPT: &str = "Enter the amount for a hypothetical investment ($)";
pub const AMOUNT_PLACEHOLDER: &str = "1000";
pub const PROCESSING_TITLE: &str = "⏳ Processing";
pub const PROCESSING_TEXT: &str = "Loading data and building the forecast. This can take a few minutes...";
pub const NEW_FORECAST_LABEL: &str = "🔄 New forecast";
pub const QUOTE_LABEL: &str = "🌐 Quote page";

pub fn quote_url(ticker: &str) -> String {
    format!("https://finance.yahoo.com/quote/{ticker}")
}

pub fn invalid_ticker(ticker: &str) -> String {
    format!("'{ticker}' is not a valid ticker. Please enter a symbol such as AAPL.")
}

pub fn invalid_amount(amount: &str) -> String {
    format!("'{amount}' is not a valid amount. Please enter a positive number.")
}

pub fn forecast_failed(err: &str) -> String {
    format!("Forecast failed: {err}")
}

pub fn forecast_title(ticker: &str, model: &str) -> String {
    format!("📈 Forecast for {ticker}\nBest model: {model}")
}

pub fn forecast_body(
    summary: &str,
    last_close: f64,
    profit: f64,
    profit_percentage: f64,
    rmse: f64,
    mape: f64,
) -> String {
    format!(
        "{summary}\n\nLast close: ${last_close:.2}\nPotential profit: ${profit:.2} ({profit_percentage:.2}%)\nRMSE: {rmse:.4} · MAPE: {:.2}%",
        mape * 100.0
    )
}

// Stats
pub const STATS_TITLE: &str = "📊 Statistics";
pub const STATS_EMPTY: &str = "You have not requested any forecasts yet.";

pub fn stats_activity(first_seen: &str, requests: u64) -> String {
    format!("Active since {first_seen}\nRequests sent: {requests}")
}

pub fn stats_body(requests: u64, last_ticker: &str, total_profit: f64) -> String {
    format!(
        "Forecasts requested: {requests}\nLast ticker: {last_ticker}\nTotal simulated profit: ${total_profit:.2}"
    )
}
