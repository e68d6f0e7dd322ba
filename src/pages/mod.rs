//! Page models: form state plus store/controller calls, rendered as text.
//!
//! Pages borrow the stores they read from the owning
//! [`Console`](crate::console::Console); each page owns only its own form
//! and association state.

pub mod agencies;
pub mod agency_detail;
pub mod agent_detail;
pub mod workflow;

pub use agencies::AgenciesPage;
pub use agency_detail::AgencyDetailPage;
pub use agent_detail::AgentDetailPage;
pub use workflow::WorkflowPage;

use crate::api::types::{Agency, Agent, NewAgency, NewAgent};

/// Form input for an optional field: blank means "unset", not `""`.
pub(crate) fn optional_input(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Display value for an optional field; unset and empty both show `N/A`.
pub(crate) fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("N/A")
}

// ── Forms ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgencyForm {
    pub name: String,
    pub description: String,
}

impl AgencyForm {
    pub fn from_agency(agency: &Agency) -> Self {
        Self {
            name: agency.name.clone(),
            description: agency.description.clone().unwrap_or_default(),
        }
    }

    /// `None` when the required name is blank.
    pub fn draft(&self) -> Option<NewAgency> {
        if self.name.trim().is_empty() {
            return None;
        }
        Some(NewAgency { name: self.name.clone(), description: optional_input(&self.description) })
    }

    /// Apply the form onto an existing agency, keeping its id.
    pub fn apply(&self, agency: &Agency) -> Option<Agency> {
        let draft = self.draft()?;
        Some(Agency { id: agency.id.clone(), name: draft.name, description: draft.description })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentForm {
    pub name: String,
    pub role: String,
}

impl AgentForm {
    pub fn from_agent(agent: &Agent) -> Self {
        Self { name: agent.name.clone(), role: agent.role.clone().unwrap_or_default() }
    }

    pub fn draft(&self) -> Option<NewAgent> {
        if self.name.trim().is_empty() {
            return None;
        }
        Some(NewAgent { name: self.name.clone(), role: optional_input(&self.role) })
    }

    pub fn apply(&self, agent: &Agent) -> Option<Agent> {
        let draft = self.draft()?;
        Some(Agent { id: agent.id.clone(), name: draft.name, role: draft.role })
    }
}
