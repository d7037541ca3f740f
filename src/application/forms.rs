//! # Form State Machine
//!
//! A form is an ordered list of fields filled one step at a time.
//!
//! States: not started → `AwaitingStep(n)` for each `n < len` → `Completed`.
//! Submissions are accepted only for the step currently awaited; anything else is a
//! no-op so that duplicated or stale button presses cannot corrupt the form.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::error::RouterError;
use crate::domain::types::{FormField, FormView, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    NotStarted,
    AwaitingStep(usize),
    Completed,
}

/// What a navigation call did to the form.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Value captured, now awaiting `step`.
    Advanced { step: usize },
    /// Every field answered; carries the collected values.
    Completed(FormData),
    /// Moved back to `step`.
    Moved { step: usize },
    /// Stale, duplicate or invalid action; nothing changed.
    Ignored,
}

/// A multi-step data-collection flow bound to a completion route.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDescriptor {
    pub title: String,
    pub text: String,
    pub completion_route: String,
    fields: Vec<FormField>,
    step: Option<usize>,
}

impl FormDescriptor {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        completion_route: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            completion_route: completion_route.into(),
            fields: Vec::new(),
            step: None,
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Current step index; `None` until the form is started.
    pub fn step(&self) -> Option<usize> {
        self.step
    }

    pub fn state(&self) -> FormState {
        match self.step {
            None => FormState::NotStarted,
            Some(step) if step >= self.fields.len() => FormState::Completed,
            Some(step) => FormState::AwaitingStep(step),
        }
    }

    #[allow(dead_code)]
    pub fn is_completed(&self) -> bool {
        self.state() == FormState::Completed
    }

    /// Field awaiting an answer, if any.
    pub fn current_field(&self) -> Option<&FormField> {
        match self.state() {
            FormState::AwaitingStep(step) => self.fields.get(step),
            _ => None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.step = Some(0);
    }

    /// Binds `value` to the field at `step` and advances.
    pub fn submit(&mut self, step: usize, value: &str) -> Transition {
        let current = match self.state() {
            FormState::AwaitingStep(current) => current,
            state => {
                tracing::debug!("Form '{}' is {:?}, ignoring submit for step {}", self.title, state, step);
                return Transition::Ignored;
            }
        };
        if step != current {
            tracing::debug!(
                "Form '{}' awaits step {}, ignoring submit for step {}",
                self.title,
                current,
                step
            );
            return Transition::Ignored;
        }

        let field = &mut self.fields[current];
        if !field.accepts(value) {
            tracing::warn!("Value '{}' rejected for form field '{}'", value, field.name);
            return Transition::Ignored;
        }
        field.value = Some(value.to_string());

        let next = current + 1;
        self.step = Some(next);
        if next == self.fields.len() {
            Transition::Completed(self.collect())
        } else {
            Transition::Advanced { step: next }
        }
    }

    /// Goes back from `step` to `step - 1` (never below zero), keeping captured values.
    ///
    /// Allowed from a completed form, which reopens it. A `step` beyond the current one
    /// is stale and ignored.
    pub fn navigate_back(&mut self, step: usize) -> Transition {
        let Some(current) = self.step else {
            return Transition::Ignored;
        };
        if step > current {
            tracing::debug!(
                "Form '{}' is at step {}, ignoring back from step {}",
                self.title,
                current,
                step
            );
            return Transition::Ignored;
        }
        let target = step.saturating_sub(1);
        self.step = Some(target);
        Transition::Moved { step: target }
    }

    /// Collects answers into a name→value mapping in declaration order.
    pub fn collect(&self) -> FormData {
        FormData(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone().unwrap_or_default()))
                .collect(),
        )
    }

    pub fn set_message_id(&mut self, step: usize, message_id: MessageId) {
        if let Some(field) = self.fields.get_mut(step) {
            field.message_id = Some(message_id);
        }
    }

    /// The renderer's view of this form at its current step.
    pub fn view(&self) -> FormView {
        FormView {
            fields: self.fields.clone(),
            step: self.step.unwrap_or(0),
        }
    }
}

/// Answers of a completed form, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for FormData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The active-form slot of a session. Never "absent": an empty slot is the explicit
/// `Empty` sentinel, which must be checked before use.
#[derive(Debug, Clone, PartialEq)]
pub enum FormSlot<T> {
    Active(T),
    Empty,
}

impl<T> FormSlot<T> {
    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Unwraps the active form, or fails with `NoActiveForm` for `session_id`.
    pub fn require(self, session_id: &str) -> Result<T, RouterError> {
        match self {
            Self::Active(form) => Ok(form),
            Self::Empty => Err(RouterError::NoActiveForm(session_id.to_string())),
        }
    }
}

impl FormSlot<&FormDescriptor> {
    pub fn cloned(self) -> FormSlot<FormDescriptor> {
        match self {
            Self::Active(form) => FormSlot::Active(form.clone()),
            Self::Empty => FormSlot::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_form() -> FormDescriptor {
        let mut form = FormDescriptor::new("Order", "Fill in", "/order/done")
            .field(FormField::text("ticker", "Ticker?"))
            .field(FormField::choice("side", "Buy or sell?", ["buy", "sell"]))
            .field(FormField::text("amount", "Amount?"));
        form.start();
        form
    }

    #[test]
    fn test_full_submission_collects_in_order() {
        let mut form = order_form();
        assert_eq!(form.submit(0, "AAPL"), Transition::Advanced { step: 1 });
        assert_eq!(form.submit(1, "buy"), Transition::Advanced { step: 2 });

        let Transition::Completed(data) = form.submit(2, "1000") else {
            panic!("form should complete");
        };
        let pairs: Vec<_> = data.iter().collect();
        assert_eq!(pairs, vec![("ticker", "AAPL"), ("side", "buy"), ("amount", "1000")]);
        assert_eq!(form.state(), FormState::Completed);
        assert!(form.current_field().is_none());
    }

    #[test]
    fn test_step_mismatch_is_noop() {
        let mut form = order_form();
        form.submit(0, "AAPL");
        let before = form.clone();

        assert_eq!(form.submit(0, "MSFT"), Transition::Ignored);
        assert_eq!(form.submit(2, "1000"), Transition::Ignored);
        assert_eq!(form, before);
        assert_eq!(form.fields()[0].value.as_deref(), Some("AAPL"));
    }

    #[test]
    fn test_invalid_choice_is_noop() {
        let mut form = order_form();
        form.submit(0, "AAPL");
        assert_eq!(form.submit(1, "hold"), Transition::Ignored);
        assert_eq!(form.state(), FormState::AwaitingStep(1));
        assert!(form.fields()[1].value.is_none());
    }

    #[test]
    fn test_back_from_zero_stays_at_zero() {
        let mut form = order_form();
        assert_eq!(form.navigate_back(0), Transition::Moved { step: 0 });
        assert_eq!(form.step(), Some(0));
    }

    #[test]
    fn test_back_keeps_values_for_resubmission() {
        let mut form = order_form();
        form.submit(0, "AAPL");
        form.submit(1, "sell");

        assert_eq!(form.navigate_back(2), Transition::Moved { step: 1 });
        assert_eq!(form.fields()[1].value.as_deref(), Some("sell"));

        assert_eq!(form.submit(1, "buy"), Transition::Advanced { step: 2 });
        let Transition::Completed(data) = form.submit(2, "5") else {
            panic!("form should complete");
        };
        assert_eq!(data.get("side"), Some("buy"));
        assert_eq!(data.get("ticker"), Some("AAPL"));
    }

    #[test]
    fn test_back_from_future_step_is_ignored() {
        let mut form = order_form();
        assert_eq!(form.navigate_back(2), Transition::Ignored);
        assert_eq!(form.step(), Some(0));
    }

    #[test]
    fn test_completed_form_can_be_reopened() {
        let mut form = order_form();
        form.submit(0, "AAPL");
        form.submit(1, "buy");
        form.submit(2, "10");

        assert_eq!(form.submit(3, "x"), Transition::Ignored);
        assert_eq!(form.navigate_back(3), Transition::Moved { step: 2 });
        assert_eq!(form.state(), FormState::AwaitingStep(2));
    }

    #[test]
    fn test_unstarted_form_ignores_actions() {
        let mut form = FormDescriptor::new("t", "", "/done").field(FormField::text("a", "A?"));
        assert_eq!(form.state(), FormState::NotStarted);
        assert_eq!(form.submit(0, "x"), Transition::Ignored);
        assert_eq!(form.navigate_back(0), Transition::Ignored);
    }

    #[test]
    fn test_form_data_serializes_as_ordered_map() {
        let data: FormData = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"b":"2","a":"1"}"#);
    }

    #[test]
    fn test_empty_slot_requires_explicit_check() {
        let slot: FormSlot<FormDescriptor> = FormSlot::Empty;
        assert!(!slot.is_active());
        assert!(matches!(slot.require("chat-1"), Err(RouterError::NoActiveForm(s)) if s == "chat-1"));
    }
}
