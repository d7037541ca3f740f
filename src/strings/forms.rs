//! # Form Strings
//!
//! Labels and prompt formatting for multi-step forms.

use crate::domain::types::FormField;

pub const BACK_LABEL: &str = "⬅️ Back";

/// Prompt shown for the awaited field, e.g. `Step 1/2: Enter the company ticker`.
pub fn step_prompt(field: &FormField, step: usize, total: usize) -> String {
    let mut prompt = format!("Step {}/{}: {}", step + 1, total, field.prompt);
    if let Some(placeholder) = &field.placeholder {
        prompt.push(' ');
        prompt.push_str(placeholder);
    }
    if let Some(value) = &field.value {
        prompt.push_str(&format!("\nCurrent value: {value}"));
    }
    prompt
}
