//! User-facing notification seam.
//!
//! The controller never renders anything itself. It hands messages and
//! choice prompts to a [`Notifier`], which the host implements: the CLI
//! prints to the terminal, a game mod would open a dialogue box.

/// Invoked with the label of the choice the user picked.
pub type ChoiceCallback = Box<dyn FnOnce(String) + Send + 'static>;

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Shows a message with no choices.
    fn notify(&self, message: &str);

    /// Shows `message` with the given choice labels and calls `on_choice`
    /// with the picked label. May return before the user answers.
    fn prompt(&self, message: &str, choices: &[String], on_choice: ChoiceCallback);
}
