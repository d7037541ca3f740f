//! # Router Errors
//!
//! Failure kinds surfaced by route registration and dispatch.
//! Middleware failures and form step mismatches never appear here: the former are
//! logged and swallowed, the latter are no-ops.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No route found for path: {0}")]
    RouteNotFound(String),

    #[error("Invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Handler '{handler}' did not return a renderable result: {reason}")]
    ProtocolViolation { handler: String, reason: String },

    #[error("Handler '{handler}' failed: {source}")]
    DispatchFailure {
        handler: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("No active form for session {0}")]
    NoActiveForm(String),

    #[error("Malformed form action: {0}")]
    MalformedFormAction(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Redirect limit of {0} exceeded")]
    RedirectLimit(usize),
}

impl RouterError {
    pub fn invalid_template(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    pub fn dispatch_failure(handler: &str, source: anyhow::Error) -> Self {
        Self::DispatchFailure {
            handler: handler.to_string(),
            source: source.into(),
        }
    }
}
