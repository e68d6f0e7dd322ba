//! Interactive confirmation seam for destructive actions.

use dialoguer::Confirm as Prompt;
use tracing::warn;

/// Asks the user to approve an action. Returning `false` aborts it.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Yes/no prompt on the controlling terminal, defaulting to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        match Prompt::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "confirmation prompt failed, treating as declined");
                false
            }
        }
    }
}

/// Non-interactive approval, for `--yes` style invocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}
