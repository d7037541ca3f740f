//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (`ChatProvider`, `ForecastProvider`).

pub mod activity;
pub mod console;
pub mod forecast;
pub mod telegram;
