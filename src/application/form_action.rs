//! # Form Actions
//!
//! Reserved callback paths that drive the active form instead of the route table:
//!
//! - `form_choice:{step}:{value}` answers `step` with `value` (the value may contain `:`)
//! - `form_back:{step}` goes back from `step`
//!
//! Free text is a third kind of action, decided by the router when the active form
//! awaits a text field; it has no wire encoding.

use crate::domain::error::RouterError;
use crate::domain::types::{FieldType, FormView, ViewOption};

pub const FORM_CHOICE_PREFIX: &str = "form_choice:";
pub const FORM_BACK_PREFIX: &str = "form_back:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Choice { step: usize, value: String },
    Back { step: usize },
    Text { value: String },
}

impl FormAction {
    pub fn is_reserved(path: &str) -> bool {
        path.starts_with(FORM_CHOICE_PREFIX) || path.starts_with(FORM_BACK_PREFIX)
    }

    /// Decodes a reserved path. Returns `None` when `path` is not a form action at all.
    pub fn decode(path: &str) -> Option<Result<Self, RouterError>> {
        if let Some(rest) = path.strip_prefix(FORM_CHOICE_PREFIX) {
            let malformed = || RouterError::MalformedFormAction(path.to_string());
            let parsed = rest
                .split_once(':')
                .ok_or_else(malformed)
                .and_then(|(step, value)| {
                    let step = step.parse::<usize>().map_err(|_| malformed())?;
                    Ok(Self::Choice {
                        step,
                        value: value.to_string(),
                    })
                });
            return Some(parsed);
        }
        if let Some(rest) = path.strip_prefix(FORM_BACK_PREFIX) {
            return Some(
                rest.parse::<usize>()
                    .map(|step| Self::Back { step })
                    .map_err(|_| RouterError::MalformedFormAction(path.to_string())),
            );
        }
        None
    }

    pub fn choice_target(step: usize, value: &str) -> String {
        format!("{FORM_CHOICE_PREFIX}{step}:{value}")
    }

    pub fn back_target(step: usize) -> String {
        format!("{FORM_BACK_PREFIX}{step}")
    }
}

/// Buttons for the step a form view is showing: one per choice, plus "back" past step 0.
pub fn step_options(form: &FormView) -> Vec<ViewOption> {
    let mut options = Vec::new();
    if let Some(field) = form.current_field()
        && field.field_type == FieldType::Choice
    {
        for choice in field.choices.iter().flatten() {
            options.push(ViewOption::link(
                choice.clone(),
                FormAction::choice_target(form.step, choice),
            ));
        }
    }
    if form.step > 0 {
        options.push(ViewOption::link(
            crate::strings::forms::BACK_LABEL,
            FormAction::back_target(form.step),
        ));
    }
    options
}
