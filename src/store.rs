//! Per-entity in-memory store: cached list, loading flag, error slot.
//!
//! One [`EntityStore`] exists per entity type. It is an explicitly owned
//! object (see [`crate::console::Console`]) handed to pages by reference.
//!
//! The cache is a projection of backend state:
//! - [`EntityStore::fetch_all`] replaces it wholesale;
//! - `create` / `update` / `delete` apply a point change only after the
//!   backend confirmed the mutation;
//! - nothing is pruned across stores.
//!
//! Failures are recorded in the error slot *and* returned, so the caller can
//! react locally (e.g. keep a form open) while renderers read the slot.
//!
//! State lives in a [`tokio::sync::watch`] channel: readers take snapshots or
//! subscribe for change notifications. The loading flag is advisory; two
//! overlapping mutations are not serialised and the last one to resolve wins
//! the cache write.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::api::types::{Agency, Agent, Entity, EntityId, Tool};
use crate::error::ApiError;

pub type AgencyStore = EntityStore<Agency>;
pub type AgentStore = EntityStore<Agent>;
pub type ToolStore = EntityStore<Tool>;

/// Observable store contents.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<E> {
    pub items: Vec<E>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self { items: Vec::new(), loading: false, error: None }
    }
}

pub struct EntityStore<E: Entity> {
    client: ApiClient,
    state: watch::Sender<StoreState<E>>,
}

impl<E: Entity> EntityStore<E> {
    /// Create an empty store. Nothing is fetched until [`fetch_all`](Self::fetch_all).
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self { client, state }
    }

    /// Drop the cached list and any recorded error.
    pub fn dispose(&self) {
        self.state.send_replace(StoreState::default());
        debug!(entity = E::NOUN, "store disposed");
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StoreState<E> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState<E>> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<E> {
        self.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<ApiError> {
        self.state.borrow().error.clone()
    }

    /// Cache lookup only. A miss returns `None`; it never triggers a fetch.
    pub fn get_by_id(&self, id: &EntityId) -> Option<E> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Replace the cache with the backend's full collection.
    ///
    /// Clears the error slot first; on failure the previous cache is kept.
    pub async fn fetch_all(&self) -> Result<(), ApiError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.client.list::<E>().await;
        match result {
            Ok(items) => {
                debug!(entity = E::NOUN, count = items.len(), "cache refreshed");
                self.state.send_modify(|s| {
                    s.items = items;
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => Err(self.fail("fetch", e)),
        }
    }

    /// POST a new entity and append the backend's copy (with its id).
    pub async fn create(&self, draft: E::Draft) -> Result<E, ApiError> {
        self.begin();
        match self.client.create::<E>(&draft).await {
            Ok(created) => {
                info!(entity = E::NOUN, id = %created.id(), "created");
                self.state.send_modify(|s| {
                    s.items.push(created.clone());
                    s.loading = false;
                });
                Ok(created)
            }
            Err(e) => Err(self.fail("create", e)),
        }
    }

    /// PUT the full entity and replace the cached item carrying the same id.
    pub async fn update(&self, entity: E) -> Result<E, ApiError> {
        self.begin();
        match self.client.update::<E>(&entity).await {
            Ok(updated) => {
                info!(entity = E::NOUN, id = %updated.id(), "updated");
                self.state.send_modify(|s| {
                    for item in s.items.iter_mut().filter(|i| i.id() == updated.id()) {
                        *item = updated.clone();
                    }
                    s.loading = false;
                });
                Ok(updated)
            }
            Err(e) => Err(self.fail("update", e)),
        }
    }

    pub async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        self.begin();
        match self.client.delete::<E>(id).await {
            Ok(()) => {
                info!(entity = E::NOUN, %id, "deleted");
                self.state.send_modify(|s| {
                    s.items.retain(|i| i.id() != id);
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => Err(self.fail("delete", e)),
        }
    }

    // Mutations leave a previous error in place; only fetch_all clears it.
    fn begin(&self) {
        self.state.send_modify(|s| s.loading = true);
    }

    fn fail(&self, op: &'static str, error: ApiError) -> ApiError {
        warn!(entity = E::NOUN, op, %error, "store operation failed");
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(error.clone());
        });
        error
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, items: Vec<E>) {
        self.state.send_modify(|s| s.items = items);
    }
}
