//! # Help Text
//!
//! Shown by the `/help` route.

pub const TITLE: &str = "ℹ️ Help";
pub const START_LABEL: &str = "Start analysis";

pub fn main_text(historical_years: u32, forecast_days: u32) -> String {
    format!(
        concat!(
            "🤖 Stock Forecast Bot\n",
            "\n",
            "How to use:\n",
            "1. Choose \"Get a stock forecast\"\n",
            "2. Enter a company ticker (e.g. AAPL, MSFT, TSLA)\n",
            "3. Enter an amount for a hypothetical investment\n",
            "4. Wait for the analysis results\n",
            "\n",
            "What the bot does:\n",
            "• Loads {years} years of historical prices\n",
            "• Trains several forecasting models\n",
            "• Picks the best model by error metrics\n",
            "• Forecasts {days} days ahead\n",
            "• Suggests buy and sell points\n",
            "• Estimates the potential profit\n",
            "\n",
            "Example tickers:\n",
            "• AAPL - Apple\n",
            "• MSFT - Microsoft\n",
            "• GOOGL - Alphabet (Google)\n",
            "• TSLA - Tesla\n",
            "• AMZN - Amazon",
        ),
        years = historical_years,
        days = forecast_days,
    )
}
