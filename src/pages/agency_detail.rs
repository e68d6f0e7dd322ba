//! `/agencies/:id`: agency details, edit/delete, and its agents.

use std::fmt::Write as _;

use tracing::{info, warn};

use super::{AgencyForm, or_na};
use crate::api::types::{Agency, Agent, EntityId};
use crate::api::{AgencyAgents, ApiClient};
use crate::association::AssociationController;
use crate::confirm::Confirm;
use crate::error::ApiError;
use crate::store::{AgencyStore, AgentStore};

pub struct AgencyDetailPage<'a> {
    agencies: &'a AgencyStore,
    agents: &'a AgentStore,
    associations: AssociationController<AgencyAgents>,
    agency_id: EntityId,
    editing: bool,
    pub form: AgencyForm,
}

impl<'a> AgencyDetailPage<'a> {
    pub fn new(
        client: ApiClient,
        agencies: &'a AgencyStore,
        agents: &'a AgentStore,
        agency_id: EntityId,
    ) -> Self {
        Self {
            agencies,
            agents,
            associations: AssociationController::new(client),
            agency_id,
            editing: false,
            form: AgencyForm::default(),
        }
    }

    /// Resolve the agency from the cache, load all agents for the picker and
    /// this agency's associated agents.
    ///
    /// The agency itself is never fetched here: the agency store must already
    /// hold it, otherwise the page renders "Agency not found.".
    pub async fn mount(&mut self) -> Result<(), ApiError> {
        match self.agency() {
            Some(agency) => self.form = AgencyForm::from_agency(&agency),
            None => warn!(agency = %self.agency_id, "agency not found in cache"),
        }
        let agents = self.agents.fetch_all().await;
        let linked = self.associations.set_primary(self.agency_id.clone()).await;
        agents.and(linked)
    }

    pub fn agency(&self) -> Option<Agency> {
        self.agencies.get_by_id(&self.agency_id)
    }

    pub fn associations(&self) -> &AssociationController<AgencyAgents> {
        &self.associations
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn start_edit(&mut self) {
        if let Some(agency) = self.agency() {
            self.form = AgencyForm::from_agency(&agency);
            self.editing = true;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    /// Save the edit form. Blank name or unknown agency sends nothing.
    pub async fn submit_update(&mut self) -> Result<Option<Agency>, ApiError> {
        let Some(updated) = self.agency().and_then(|a| self.form.apply(&a)) else {
            return Ok(None);
        };
        let saved = self.agencies.update(updated).await?;
        self.editing = false;
        Ok(Some(saved))
    }

    /// Delete the agency after confirmation. Returns whether it was deleted.
    pub async fn delete(&mut self, confirm: &mut impl Confirm) -> Result<bool, ApiError> {
        // Only an entity the page can show may be deleted from it.
        let Some(target) = self.agency() else {
            warn!(agency = %self.agency_id, "delete skipped, agency not in cache");
            return Ok(false);
        };
        let prompt = format!("Are you sure you want to delete agency \"{}\"?", target.name);
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        self.agencies.delete(&self.agency_id).await?;
        info!(agency = %self.agency_id, "agency deleted");
        self.editing = false;
        Ok(true)
    }

    pub async fn assign_agent(&self, agent_id: &EntityId) -> Result<(), ApiError> {
        self.associations.assign(agent_id).await
    }

    pub async fn remove_agent(&self, agent_id: &EntityId) -> Result<(), ApiError> {
        self.associations.remove(agent_id).await
    }

    /// Agents offered in the "assign" picker.
    pub fn assignable_agents(&self) -> Vec<Agent> {
        self.associations.assignable(self.agents)
    }

    pub fn render(&self) -> String {
        let agencies = self.agencies.snapshot();
        let agents = self.agents.snapshot();
        if agencies.loading || agents.loading {
            return "Loading details...\n".to_string();
        }
        if let Some(e) = &agencies.error {
            return format!("Error loading agency: {e}\n");
        }
        if let Some(e) = &agents.error {
            return format!("Error loading agents: {e}\n");
        }
        let Some(agency) = self.agency() else {
            return "Agency not found.\n".to_string();
        };

        let mut out = String::new();
        let _ = writeln!(out, "Back to Agencies (/agencies)");
        let _ = writeln!(out, "# Agency Details: {}", agency.name);
        if self.editing {
            let _ = writeln!(out, "Name: {}", self.form.name);
            let _ = writeln!(out, "Description: {}", self.form.description);
            let _ = writeln!(out, "[Save Changes] [Cancel]");
        } else {
            let _ = writeln!(out, "ID: {}", agency.id);
            let _ = writeln!(out, "Name: {}", agency.name);
            let _ = writeln!(out, "Description: {}", or_na(agency.description.as_deref()));
            let _ = writeln!(out, "Workflow: /workflow/{}", agency.id);
        }

        let assoc = self.associations.snapshot();
        let _ = writeln!(out, "\n## Associated Agents");
        let _ = writeln!(out, "### Assign Agent");
        let assignable = self.assignable_agents();
        if assignable.is_empty() {
            let _ = writeln!(out, "(no agents available to assign)");
        }
        for agent in &assignable {
            let _ = writeln!(out, "  + {} [{}]", agent.name, agent.id);
        }

        if assoc.loading {
            let _ = writeln!(out, "Loading associations...");
        }
        if let Some(e) = &assoc.error {
            let _ = writeln!(out, "Error managing associations: {e}");
        }
        if !assoc.loading && assoc.linked.is_empty() {
            let _ = writeln!(out, "No agents currently associated with this agency.");
        } else {
            for agent in &assoc.linked {
                let _ = writeln!(
                    out,
                    "- {} (/agencies/{}/agents/{}) [Remove]",
                    agent.name, agency.id, agent.id
                );
            }
        }
        out
    }
}
