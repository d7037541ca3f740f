//! # Strings Module
//!
//! Centralizes user-facing strings and help text.

pub mod forms;
pub mod help;
pub mod messages;
