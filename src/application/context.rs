//! # Request Context
//!
//! The inbound event as seen by the router, and the typed context every handler and
//! middleware receives. Handlers read path parameters and form answers through named
//! accessors instead of declaring them as arguments.

use std::collections::HashMap;

use crate::application::forms::FormData;
use crate::domain::types::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// A slash command typed by the user.
    Command,
    /// Free text typed by the user.
    Text,
    /// A button press; `message_id` is the bot message carrying the button.
    Callback,
    /// Re-dispatch after a render asked for a redirect; `message_id` is the message
    /// that render produced.
    Redirect,
}

/// One message or button press from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub session_id: String,
    pub user_id: String,
    pub chat_id: String,
    pub message_id: Option<MessageId>,
    pub kind: InboundKind,
    pub text: String,
}

impl InboundEvent {
    /// An event in a one-to-one chat, where the chat is the session.
    pub fn new(
        chat_id: impl Into<String>,
        user_id: impl Into<String>,
        kind: InboundKind,
        text: impl Into<String>,
    ) -> Self {
        let chat_id = chat_id.into();
        Self {
            session_id: chat_id.clone(),
            user_id: user_id.into(),
            chat_id,
            message_id: None,
            kind,
            text: text.into(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<MessageId>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// The event a redirect to `path` is dispatched as.
    pub fn redirected(&self, path: &str, rendered: MessageId) -> Self {
        Self {
            message_id: Some(rendered),
            kind: InboundKind::Redirect,
            text: path.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    event: InboundEvent,
    path: String,
    template: String,
    params: HashMap<String, String>,
    form_data: Option<FormData>,
}

impl RequestContext {
    pub fn new(
        event: InboundEvent,
        path: impl Into<String>,
        template: impl Into<String>,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            event,
            path: path.into(),
            template: template.into(),
            params,
            form_data: None,
        }
    }

    pub fn with_form_data(mut self, data: FormData) -> Self {
        self.form_data = Some(data);
        self
    }

    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The template the path matched.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn user_id(&self) -> &str {
        &self.event.user_id
    }

    pub fn chat_id(&self) -> &str {
        &self.event.chat_id
    }

    #[allow(dead_code)]
    pub fn session_id(&self) -> &str {
        &self.event.session_id
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// A captured path parameter; `None` when the matched template has no such placeholder.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A captured path parameter, or the handler's own default.
    pub fn param_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.param(name).unwrap_or(default)
    }

    /// Answers of the form whose completion led here.
    pub fn form_data(&self) -> Option<&FormData> {
        self.form_data.as_ref()
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form_data().and_then(|d| d.get(name))
    }
}
