//! Create / edit / delete dialog for a single tool.
//!
//! The dialog is in edit mode when opened with a tool and in create mode
//! otherwise. Saving goes through the [`ToolStore`]; on failure the dialog
//! stays open and the store's error slot carries the message to show.

use std::fmt::{self, Write as _};

use tracing::debug;

use crate::api::types::{NewTool, Tool};
use crate::confirm::Confirm;
use crate::error::ApiError;
use crate::store::ToolStore;

/// What a submit or delete attempt ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalOutcome {
    Saved(Tool),
    Deleted,
    /// Nothing sent: the dialog is closed, not in edit mode, or the name is blank.
    Blocked,
    /// The user declined the delete confirmation.
    Declined,
}

type SuccessCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
pub struct ToolModal {
    open: bool,
    tool: Option<Tool>,
    pub name: String,
    pub kind: String,
    on_success: Option<SuccessCallback>,
}

impl fmt::Debug for ToolModal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolModal")
            .field("open", &self.open)
            .field("tool", &self.tool)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

impl ToolModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` after every successful save or delete, before closing.
    pub fn with_on_success(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Open for `tool` (edit) or `None` (create); the form is reset from it.
    pub fn open(&mut self, tool: Option<Tool>) {
        self.name = tool.as_ref().map(|t| t.name.clone()).unwrap_or_default();
        self.kind = tool.as_ref().and_then(|t| t.kind.clone()).unwrap_or_default();
        self.tool = tool;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.tool = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_edit(&self) -> bool {
        self.tool.is_some()
    }

    pub fn tool(&self) -> Option<&Tool> {
        self.tool.as_ref()
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit() { "Edit Tool" } else { "Create New Tool" }
    }

    /// Create or update, depending on the mode.
    ///
    /// Create sends the type field as typed, so an empty input goes out as
    /// `""` rather than being omitted.
    pub async fn submit(&mut self, tools: &ToolStore) -> Result<ModalOutcome, ApiError> {
        if !self.open || self.name.trim().is_empty() {
            return Ok(ModalOutcome::Blocked);
        }

        let saved = match &self.tool {
            Some(existing) => {
                let updated = Tool {
                    id: existing.id.clone(),
                    name: self.name.clone(),
                    kind: Some(self.kind.clone()),
                };
                tools.update(updated).await?
            }
            None => {
                let draft = NewTool { name: self.name.clone(), kind: Some(self.kind.clone()) };
                tools.create(draft).await?
            }
        };

        debug!(id = %saved.id, "tool modal saved");
        self.succeed();
        Ok(ModalOutcome::Saved(saved))
    }

    /// Delete the tool being edited, after an explicit confirmation.
    pub async fn delete(
        &mut self,
        tools: &ToolStore,
        confirm: &mut impl Confirm,
    ) -> Result<ModalOutcome, ApiError> {
        let Some(tool) = self.tool.clone().filter(|_| self.open) else {
            return Ok(ModalOutcome::Blocked);
        };
        let prompt = format!("Are you sure you want to delete tool \"{}\"?", tool.name);
        if !confirm.confirm(&prompt) {
            return Ok(ModalOutcome::Declined);
        }

        tools.delete(&tool.id).await?;
        self.succeed();
        Ok(ModalOutcome::Deleted)
    }

    fn succeed(&mut self) {
        if let Some(callback) = self.on_success.as_mut() {
            callback();
        }
        self.close();
    }

    /// Text rendering; empty when closed.
    pub fn render(&self, tools: &ToolStore) -> String {
        if !self.open {
            return String::new();
        }
        let state = tools.snapshot();
        let mut out = String::new();
        let _ = writeln!(out, "## {}", self.title());
        let _ = writeln!(out, "Tool Name: {}", self.name);
        let _ = writeln!(out, "Tool Type (Optional): {}", self.kind);
        if let Some(e) = &state.error {
            let _ = writeln!(out, "Error: {e}");
        }
        let action = match (state.loading, self.is_edit()) {
            (true, _) => "Saving...",
            (false, true) => "Save Changes",
            (false, false) => "Create Tool",
        };
        let _ = write!(out, "[{action}]");
        if self.is_edit() {
            let _ = write!(out, " [Delete Tool]");
        }
        let _ = writeln!(out, " [Cancel]");
        out
    }
}
