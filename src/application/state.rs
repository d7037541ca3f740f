//! # Bot State
//!
//! Per-session state (`SessionState`) held in memory by `BotState`.
//! The active form of each conversation lives here; in `FormScope::Global` every
//! session shares one slot instead.
//! Sessions get an entry only once they start a form.
//! Nothing is persisted: a restart drops all open forms.

use std::collections::HashMap;

use crate::application::forms::{FormDescriptor, FormSlot};
use crate::domain::config::FormScope;

const GLOBAL_KEY: &str = "*";

/// State for a single conversation.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    /// The last form started here. Completion does not clear it; only the next
    /// `start_form` replaces it.
    pub form: Option<FormDescriptor>,
}

#[derive(Debug, Default)]
pub struct BotState {
    scope: FormScope,
    sessions: HashMap<String, SessionState>,
}

impl BotState {
    pub fn new(scope: FormScope) -> Self {
        Self {
            scope,
            sessions: HashMap::new(),
        }
    }

    fn key<'a>(&self, session_id: &'a str) -> &'a str {
        match self.scope {
            FormScope::Session => session_id,
            FormScope::Global => GLOBAL_KEY,
        }
    }

    /// Gets or creates the state for a specific session.
    pub fn get_session_state(&mut self, session_id: &str) -> &mut SessionState {
        let key = self.key(session_id).to_string();
        self.sessions.entry(key).or_default()
    }

    /// Installs `form` as the sole active form of the session, at step 0.
    pub fn start_form(&mut self, session_id: &str, mut form: FormDescriptor) -> &mut FormDescriptor {
        form.start();
        tracing::info!(
            "Starting form '{}' ({} fields) for session {}",
            form.title,
            form.fields().len(),
            session_id
        );
        self.get_session_state(session_id).form.insert(form)
    }

    pub fn current_form(&self, session_id: &str) -> FormSlot<&FormDescriptor> {
        match self
            .sessions
            .get(self.key(session_id))
            .and_then(|s| s.form.as_ref())
        {
            Some(form) => FormSlot::Active(form),
            None => FormSlot::Empty,
        }
    }

    pub fn current_form_mut(&mut self, session_id: &str) -> FormSlot<&mut FormDescriptor> {
        let key = self.key(session_id).to_string();
        match self.sessions.get_mut(&key).and_then(|s| s.form.as_mut()) {
            Some(form) => FormSlot::Active(form),
            None => FormSlot::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::forms::Transition;
    use crate::domain::types::FormField;

    fn form(title: &str) -> FormDescriptor {
        FormDescriptor::new(title, "", "/done").field(FormField::text("a", "A?"))
    }

    #[test]
    fn test_sessions_have_separate_slots() {
        let mut state = BotState::new(FormScope::Session);
        state.start_form("alice", form("A"));
        state.start_form("bob", form("B"));

        let FormSlot::Active(a) = state.current_form("alice") else {
            panic!("alice should have a form");
        };
        assert_eq!(a.title, "A");
        assert!(!state.current_form("carol").is_active());
    }

    #[test]
    fn test_global_scope_shares_one_slot() {
        let mut state = BotState::new(FormScope::Global);
        state.start_form("alice", form("A"));
        state.start_form("bob", form("B"));

        let FormSlot::Active(seen) = state.current_form("alice") else {
            panic!("global slot should be filled");
        };
        assert_eq!(seen.title, "B");
    }

    #[test]
    fn test_start_replaces_previous_form() {
        let mut state = BotState::new(FormScope::Session);
        state.start_form("alice", form("A"));
        if let FormSlot::Active(f) = state.current_form_mut("alice") {
            assert!(matches!(f.submit(0, "x"), Transition::Completed(_)));
        }

        let installed = state.start_form("alice", form("Again"));
        assert_eq!(installed.step(), Some(0));
        assert!(installed.fields()[0].value.is_none());
    }

    #[test]
    fn test_reading_does_not_create_sessions() {
        let mut state = BotState::new(FormScope::Session);
        assert!(!state.current_form("alice").is_active());
        assert!(!state.current_form_mut("bob").is_active());
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn test_completed_form_stays_installed() {
        let mut state = BotState::new(FormScope::Session);
        state.start_form("alice", form("A"));
        if let FormSlot::Active(f) = state.current_form_mut("alice") {
            f.submit(0, "x");
        }
        let slot = state.current_form("alice").cloned();
        assert!(slot.require("alice").unwrap().is_completed());
    }
}
