//! `/agencies/:agencyId/agents/:agentId`: agent details, its tools, and the
//! tool dialog.

use std::fmt::Write as _;

use tracing::{info, warn};

use super::{AgentForm, or_na};
use crate::api::types::{Agent, EntityId, Tool};
use crate::api::{AgentTools, ApiClient};
use crate::association::AssociationController;
use crate::confirm::Confirm;
use crate::error::ApiError;
use crate::modal::{ModalOutcome, ToolModal};
use crate::store::{AgentStore, ToolStore};

pub struct AgentDetailPage<'a> {
    agents: &'a AgentStore,
    tools: &'a ToolStore,
    associations: AssociationController<AgentTools>,
    agency_id: EntityId,
    agent_id: EntityId,
    editing: bool,
    pub form: AgentForm,
    pub modal: ToolModal,
}

impl<'a> AgentDetailPage<'a> {
    pub fn new(
        client: ApiClient,
        agents: &'a AgentStore,
        tools: &'a ToolStore,
        agency_id: EntityId,
        agent_id: EntityId,
    ) -> Self {
        Self {
            agents,
            tools,
            associations: AssociationController::new(client),
            agency_id,
            agent_id,
            editing: false,
            form: AgentForm::default(),
            modal: ToolModal::new(),
        }
    }

    /// Resolve the agent from the cache, load all tools for the picker and
    /// this agent's associated tools.
    pub async fn mount(&mut self) -> Result<(), ApiError> {
        match self.agent() {
            Some(agent) => self.form = AgentForm::from_agent(&agent),
            None => warn!(agent = %self.agent_id, "agent not found in cache"),
        }
        let tools = self.tools.fetch_all().await;
        let linked = self.associations.set_primary(self.agent_id.clone()).await;
        tools.and(linked)
    }

    pub fn agent(&self) -> Option<Agent> {
        self.agents.get_by_id(&self.agent_id)
    }

    pub fn associations(&self) -> &AssociationController<AgentTools> {
        &self.associations
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn start_edit(&mut self) {
        if let Some(agent) = self.agent() {
            self.form = AgentForm::from_agent(&agent);
            self.editing = true;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    pub async fn submit_update(&mut self) -> Result<Option<Agent>, ApiError> {
        let Some(updated) = self.agent().and_then(|a| self.form.apply(&a)) else {
            return Ok(None);
        };
        let saved = self.agents.update(updated).await?;
        self.editing = false;
        Ok(Some(saved))
    }

    pub async fn delete(&mut self, confirm: &mut impl Confirm) -> Result<bool, ApiError> {
        // Only an entity the page can show may be deleted from it.
        let Some(target) = self.agent() else {
            warn!(agent = %self.agent_id, "delete skipped, agent not in cache");
            return Ok(false);
        };
        let prompt = format!("Are you sure you want to delete agent \"{}\"?", target.name);
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        self.agents.delete(&self.agent_id).await?;
        info!(agent = %self.agent_id, "agent deleted");
        self.editing = false;
        Ok(true)
    }

    // ── Tool associations ─────────────────────────────────────────────────────

    pub async fn assign_tool(&self, tool_id: &EntityId) -> Result<(), ApiError> {
        self.associations.assign(tool_id).await
    }

    pub async fn remove_tool(&self, tool_id: &EntityId) -> Result<(), ApiError> {
        self.associations.remove(tool_id).await
    }

    pub fn assignable_tools(&self) -> Vec<Tool> {
        self.associations.assignable(self.tools)
    }

    // ── Tool dialog ───────────────────────────────────────────────────────────

    pub fn open_create_tool(&mut self) {
        self.modal.open(None);
    }

    /// Open the dialog for one of this agent's associated tools.
    /// Returns `false` if the tool is not associated.
    pub fn open_edit_tool(&mut self, tool_id: &EntityId) -> bool {
        let Some(tool) = self.associations.linked().into_iter().find(|t| &t.id == tool_id) else {
            return false;
        };
        self.modal.open(Some(tool));
        true
    }

    pub fn close_tool_modal(&mut self) {
        self.modal.close();
    }

    /// Save the dialog; a successful save re-syncs this agent's tool list.
    pub async fn submit_tool_modal(&mut self) -> Result<ModalOutcome, ApiError> {
        let outcome = self.modal.submit(self.tools).await?;
        self.after_modal(&outcome).await?;
        Ok(outcome)
    }

    pub async fn delete_tool_in_modal(&mut self, confirm: &mut impl Confirm) -> Result<ModalOutcome, ApiError> {
        let outcome = self.modal.delete(self.tools, confirm).await?;
        self.after_modal(&outcome).await?;
        Ok(outcome)
    }

    async fn after_modal(&self, outcome: &ModalOutcome) -> Result<(), ApiError> {
        match outcome {
            ModalOutcome::Saved(_) | ModalOutcome::Deleted => self.associations.refresh().await,
            ModalOutcome::Blocked | ModalOutcome::Declined => Ok(()),
        }
    }

    pub fn render(&self) -> String {
        let agents = self.agents.snapshot();
        let tools = self.tools.snapshot();
        if agents.loading || tools.loading {
            return "Loading details...\n".to_string();
        }
        if let Some(e) = &agents.error {
            return format!("Error loading agent: {e}\n");
        }
        if let Some(e) = &tools.error {
            return format!("Error loading tools: {e}\n");
        }
        let Some(agent) = self.agent() else {
            return "Agent not found.\n".to_string();
        };

        let mut out = String::new();
        // Reached without an agency (e.g. from the CLI) there is nowhere to go back to.
        if !self.agency_id.is_blank() {
            let _ = writeln!(out, "Back to Agency (/agencies/{})", self.agency_id);
        }
        let _ = writeln!(out, "# Agent Details: {}", agent.name);
        if self.editing {
            let _ = writeln!(out, "Name: {}", self.form.name);
            let _ = writeln!(out, "Role: {}", self.form.role);
            let _ = writeln!(out, "[Save Changes] [Cancel]");
        } else {
            let _ = writeln!(out, "ID: {}", agent.id);
            let _ = writeln!(out, "Name: {}", agent.name);
            let _ = writeln!(out, "Role: {}", or_na(agent.role.as_deref()));
        }

        let assoc = self.associations.snapshot();
        let _ = writeln!(out, "\n## Associated Tools");
        let _ = writeln!(out, "[Create New Tool]");
        let _ = writeln!(out, "### Assign Existing Tool");
        let assignable = self.assignable_tools();
        if assignable.is_empty() {
            let _ = writeln!(out, "(no tools available to assign)");
        }
        for tool in &assignable {
            let _ = writeln!(out, "  + {} [{}]", tool.name, tool.id);
        }

        if assoc.loading {
            let _ = writeln!(out, "Loading associations...");
        }
        if let Some(e) = &assoc.error {
            let _ = writeln!(out, "Error managing associations: {e}");
        }
        if !assoc.loading && assoc.linked.is_empty() {
            let _ = writeln!(out, "No tools currently associated with this agent.");
        } else {
            for tool in &assoc.linked {
                let _ = writeln!(out, "- {} [{}] [Edit] [Remove Association]", tool.name, tool.id);
            }
        }

        let modal = self.modal.render(self.tools);
        if !modal.is_empty() {
            out.push('\n');
            out.push_str(&modal);
        }
        out
    }
}
