//! The interactive-selection capability interface.
//!
//! Resolution needs to ask the user to pick from a list. The capability is
//! chosen once at startup: a terminal menu when stdin/stdout are a TTY, or
//! [`NonInteractivePrompter`], which fails fast the moment a prompt would
//! be required. Cancellation is a distinct selection value, never an empty
//! string.

/// Errors raised by a prompter.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// A prompt was required but the runtime has no interactive capability.
    #[error(
        "'{title}' requires an interactive terminal; pass the target explicitly or set the corresponding environment variable"
    )]
    NonInteractive { title: String },

    /// The terminal could not be driven (raw mode, cursor movement).
    #[error("terminal error during selection: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Display options for a selection menu.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Number of rows shown at once; longer lists page.
    pub page_size: usize,
    /// Whether typed characters narrow the list.
    pub filter: bool,
    /// Whether an explicit Cancel choice is offered.
    pub allow_cancel: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            filter: true,
            allow_cancel: true,
        }
    }
}

/// The result of one menu interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The chosen entry, verbatim.
    Choice(String),
    /// The user dismissed the menu without choosing.
    Cancelled,
}

/// Capability interface for asking the user to pick one of several choices.
pub trait Prompter {
    /// Presents `choices` under `title` and returns the selection.
    fn select(
        &self,
        title: &str,
        choices: &[String],
        options: &PromptOptions,
    ) -> Result<Selection, PromptError>;
}

/// Prompter for non-interactive runs (CI, redirected stdio).
///
/// Every selection attempt is an error naming the prompt that would have
/// been shown, so scripted callers learn which argument or environment
/// variable to provide.
#[derive(Debug, Default)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn select(
        &self,
        title: &str,
        _choices: &[String],
        _options: &PromptOptions,
    ) -> Result<Selection, PromptError> {
        Err(PromptError::NonInteractive {
            title: title.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_interactive_prompter_fails_with_title() {
        let prompter = NonInteractivePrompter;
        let err = prompter
            .select("Select module", &["Alpha".to_string()], &PromptOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("Select module"));
    }
}
