//! # Application Layer
//!
//! Routing and orchestration: route table, form state machine, middleware, the
//! dispatcher and the per-session inbox that feeds it.

pub mod context;
pub mod form_action;
pub mod forms;
pub mod inbox;
pub mod logging;
pub mod middleware;
pub mod render;
pub mod router;
pub mod routes;
pub mod state;
#[cfg(test)]
pub mod testing;
