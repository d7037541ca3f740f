//! # Deferred Renders
//!
//! Handlers never talk to the chat transport. They return a `DeferredRender` describing
//! the message to show; the router validates it and executes it against the
//! `ChatProvider` of the conversation.

use std::collections::HashSet;

use crate::application::context::{InboundEvent, InboundKind};
use crate::application::form_action::{self, FormAction};
use crate::application::forms::FormDescriptor;
use crate::domain::error::RouterError;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{FieldType, MessageId, OptionKind, View, ViewOption};

/// Largest callback payload a button can carry (Telegram's `callback_data` limit).
pub const MAX_CALLBACK_BYTES: usize = 64;

/// What to show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderIntent {
    Text(String),
    View(View),
    /// Start this form in the session and show its first step.
    Form(FormDescriptor),
    Error(String),
}

/// Where to show it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Edit the message a button press or redirect came from, otherwise send.
    #[default]
    Auto,
    New,
    /// Delete the inbound message, then send.
    Replace,
    Edit(MessageId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeferredRender {
    pub intent: RenderIntent,
    pub mode: RenderMode,
    /// Path dispatched after this render completes.
    pub redirect: Option<String>,
}

impl DeferredRender {
    fn with_intent(intent: RenderIntent) -> Self {
        Self {
            intent,
            mode: RenderMode::Auto,
            redirect: None,
        }
    }

    #[allow(dead_code)]
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_intent(RenderIntent::Text(text.into()))
    }

    pub fn view(view: View) -> Self {
        Self::with_intent(RenderIntent::View(view))
    }

    pub fn form(form: FormDescriptor) -> Self {
        Self::with_intent(RenderIntent::Form(form))
    }

    #[allow(dead_code)]
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_intent(RenderIntent::Error(message.into()))
    }

    pub fn replace_current(mut self) -> Self {
        self.mode = RenderMode::Replace;
        self
    }

    pub fn then(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }

    /// Checks that this render can actually be drawn.
    pub fn validate(&self) -> Result<(), String> {
        match &self.intent {
            RenderIntent::Text(text) if text.trim().is_empty() => {
                return Err("empty text".to_string());
            }
            RenderIntent::Error(message) if message.trim().is_empty() => {
                return Err("empty error message".to_string());
            }
            RenderIntent::View(view) => validate_view(view)?,
            RenderIntent::Form(form) => validate_form(form)?,
            _ => {}
        }
        if let Some(redirect) = &self.redirect
            && (redirect.trim().is_empty() || FormAction::is_reserved(redirect))
        {
            return Err(format!("cannot redirect to '{redirect}'"));
        }
        Ok(())
    }

    /// The view drawn for non-form intents.
    pub fn to_view(&self) -> Option<View> {
        match &self.intent {
            RenderIntent::Text(text) => Some(View::new("", text.clone())),
            RenderIntent::View(view) => Some(view.clone()),
            RenderIntent::Error(message) => Some(error_view(message)),
            RenderIntent::Form(_) => None,
        }
    }
}

fn validate_view(view: &View) -> Result<(), String> {
    if view.title.trim().is_empty() && view.text.trim().is_empty() && view.image.is_none() {
        return Err("view has no title, text or image".to_string());
    }
    if let Some(option) = view
        .options
        .iter()
        .find(|o| o.label.trim().is_empty() || o.target.trim().is_empty())
    {
        return Err(format!("option {option:?} has an empty label or target"));
    }
    if let Some(option) = view
        .options
        .iter()
        .find(|o| o.kind == OptionKind::Callback && o.target.len() > MAX_CALLBACK_BYTES)
    {
        return Err(format!(
            "callback '{}' is longer than {} bytes",
            option.target, MAX_CALLBACK_BYTES
        ));
    }
    Ok(())
}

fn validate_form(form: &FormDescriptor) -> Result<(), String> {
    if form.fields().is_empty() {
        return Err(format!("form '{}' has no fields", form.title));
    }
    if form.completion_route.trim().is_empty() {
        return Err(format!("form '{}' has no completion route", form.title));
    }
    let mut names = HashSet::new();
    for (step, field) in form.fields().iter().enumerate() {
        if !names.insert(field.name.as_str()) {
            return Err(format!("duplicate form field '{}'", field.name));
        }
        if field.field_type == FieldType::Choice
            && field.choices.as_ref().is_some_and(|c| c.is_empty())
        {
            return Err(format!("choice field '{}' has no choices", field.name));
        }
        if let Some(choice) = field
            .choices
            .iter()
            .flatten()
            .find(|c| FormAction::choice_target(step, c).len() > MAX_CALLBACK_BYTES)
        {
            return Err(format!(
                "choice '{}' of field '{}' does not fit in a callback",
                choice, field.name
            ));
        }
    }
    Ok(())
}

pub fn error_view(message: &str) -> View {
    View::new(crate::strings::messages::ERROR_TITLE, message)
        .option(ViewOption::link(crate::strings::messages::BACK_LABEL, "/"))
}

/// Message body of `view`: its text followed, for forms, by the prompt of the awaited step.
pub fn body(view: &View) -> String {
    let prompt = view.form.as_ref().and_then(|form| {
        form.current_field()
            .map(|field| crate::strings::forms::step_prompt(field, form.step, form.fields.len()))
    });
    match prompt {
        Some(prompt) if view.text.is_empty() => prompt,
        Some(prompt) => format!("{}\n\n{}", view.text, prompt),
        None => view.text.clone(),
    }
}

/// Buttons of `view`: its own options, then the controls of the form step it shows.
pub fn buttons(view: &View) -> Vec<ViewOption> {
    let mut options = view.options.clone();
    if let Some(form) = &view.form {
        options.extend(form_action::step_options(form));
    }
    options
}

/// Draws `view` for `event` according to `mode`, returning the message shown.
///
/// A failed edit falls back to sending a new message (e.g., the message is too old
/// or was deleted).
pub async fn deliver(
    chat: &dyn ChatProvider,
    event: &InboundEvent,
    view: &View,
    mode: &RenderMode,
) -> Result<MessageId, RouterError> {
    let edit_target = match mode {
        RenderMode::Edit(id) => Some(id.as_str()),
        RenderMode::Auto => match event.kind {
            InboundKind::Callback | InboundKind::Redirect => event.message_id.as_deref(),
            InboundKind::Command | InboundKind::Text => None,
        },
        RenderMode::New => None,
        RenderMode::Replace => {
            if let Some(id) = &event.message_id
                && let Err(e) = chat.delete_message(id).await
            {
                tracing::warn!("Failed to delete message {}: {}", id, e);
            }
            None
        }
    };

    if let Some(id) = edit_target {
        match chat.edit_view(id, view).await {
            Ok(new_id) => return Ok(new_id),
            Err(e) => tracing::warn!("Failed to edit message {}, sending new: {}", id, e),
        }
    }
    chat.send_view(view).await.map_err(RouterError::Render)
}
