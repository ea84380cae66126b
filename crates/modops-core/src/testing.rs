//! Test doubles for resolution and prompting.

use crate::prompt::{PromptError, PromptOptions, Prompter, Selection};
use std::cell::RefCell;
use std::collections::VecDeque;

/// A prompter that replays a fixed script of selections.
///
/// Records every title it was asked for, so tests can assert whether (and
/// what) a code path prompted. When the script runs out, further prompts
/// cancel.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    responses: RefCell<VecDeque<Selection>>,
    titles: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(responses: impl IntoIterator<Item = Selection>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            titles: RefCell::new(Vec::new()),
        }
    }

    /// A prompter that answers each prompt with the next given choice.
    pub fn choosing(choices: &[&str]) -> Self {
        Self::new(
            choices
                .iter()
                .map(|choice| Selection::Choice((*choice).to_string()))
                .collect::<Vec<_>>(),
        )
    }

    /// A prompter that cancels every prompt.
    pub fn cancelling() -> Self {
        Self::default()
    }

    /// Titles of every prompt shown so far, in order.
    pub fn prompt_titles(&self) -> Vec<String> {
        self.titles.borrow().clone()
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.titles.borrow().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn select(
        &self,
        title: &str,
        _choices: &[String],
        _options: &PromptOptions,
    ) -> Result<Selection, PromptError> {
        self.titles.borrow_mut().push(title.to_string());
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(Selection::Cancelled))
    }
}
