//! [`Console`] owns the API client and the three entity stores.
//!
//! Created once at startup and passed by reference to whatever renders or
//! mutates state; there is no global store lookup. [`Console::dispose`]
//! empties every cache.

use std::time::Duration;

use tracing::debug;

use crate::api::ApiClient;
use crate::api::types::{Entity, EntityId};
use crate::config::ApiConfig;
use crate::error::{ApiError, AppError};
use crate::pages::{AgenciesPage, AgencyDetailPage, AgentDetailPage, WorkflowPage};
use crate::routes::Route;
use crate::store::{AgencyStore, AgentStore, EntityStore, ToolStore};

pub struct Console {
    client: ApiClient,
    pub agencies: AgencyStore,
    pub agents: AgentStore,
    pub tools: ToolStore,
}

impl Console {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let timeout = config.timeout_seconds.map(Duration::from_secs);
        let client = ApiClient::new(&config.base_url, timeout)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self {
            agencies: EntityStore::new(client.clone()),
            agents: EntityStore::new(client.clone()),
            tools: EntityStore::new(client.clone()),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn dispose(&self) {
        self.agencies.dispose();
        self.agents.dispose();
        self.tools.dispose();
    }

    /// Mount the page for `route` and return its rendering.
    ///
    /// Detail pages read their entity from the store cache only. Arriving at
    /// one directly (rather than from the list that filled the cache) would
    /// always render "not found", so an empty cache is filled first.
    pub async fn open(&self, route: &Route) -> String {
        debug!(%route, "opening route");
        match route {
            Route::Agencies => {
                let page = AgenciesPage::new(&self.agencies);
                let _ = page.mount().await;
                page.render()
            }
            Route::Agency { id } => {
                warm(&self.agencies).await;
                let mut page = self.agency_page(id.clone());
                let _ = page.mount().await;
                page.render()
            }
            Route::Agent { agency_id, agent_id } => {
                warm(&self.agents).await;
                let mut page = self.agent_page(agency_id.clone(), agent_id.clone());
                let _ = page.mount().await;
                page.render()
            }
            Route::Workflow { agency_id } => {
                let mut page = WorkflowPage::new(&self.client, agency_id.clone());
                let _ = page.mount().await;
                page.render()
            }
            Route::NotFound { .. } => "404 Not Found\n".to_string(),
        }
    }

    pub fn agency_page(&self, id: EntityId) -> AgencyDetailPage<'_> {
        AgencyDetailPage::new(self.client.clone(), &self.agencies, &self.agents, id)
    }

    pub fn agent_page(
        &self,
        agency_id: EntityId,
        agent_id: EntityId,
    ) -> AgentDetailPage<'_> {
        AgentDetailPage::new(self.client.clone(), &self.agents, &self.tools, agency_id, agent_id)
    }
}

/// Cached entity by id, or a usage error naming the missing entity.
///
/// Command paths call this before editing or deleting so an unknown id is
/// reported as such instead of as a blocked form.
pub fn lookup<E: Entity>(store: &EntityStore<E>, id: &EntityId) -> Result<E, AppError> {
    store
        .get_by_id(id)
        .ok_or_else(|| AppError::Usage(format!("{} {id} not found", E::NOUN)))
}

/// Fill an empty cache; a failure stays in the store's error slot for the
/// page to render.
async fn warm<E: Entity>(store: &EntityStore<E>) {
    if store.items().is_empty() {
        let _ = store.fetch_all().await;
    }
}
