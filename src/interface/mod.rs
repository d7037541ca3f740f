//! # Interface Layer
//!
//! Route handlers exposed to users through the router.

pub mod commands;
