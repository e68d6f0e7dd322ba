//! Association controller: the secondaries linked to one primary entity.
//!
//! The list is fetched from the nested association endpoint and is kept
//! separate from the global [`EntityStore`] caches. After every link or
//! unlink the controller re-fetches the whole list instead of patching it
//! locally, so what it shows always matches the backend, at the price of
//! one extra round trip per mutation.
//!
//! If the link call succeeds but the re-fetch fails, the error is recorded
//! and the link stays in place; nothing is rolled back.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::types::{Entity, EntityId};
use crate::api::{ApiClient, Link};
use crate::error::ApiError;
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationState<S> {
    pub primary: Option<EntityId>,
    pub linked: Vec<S>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<S> Default for AssociationState<S> {
    fn default() -> Self {
        Self { primary: None, linked: Vec::new(), loading: false, error: None }
    }
}

pub struct AssociationController<L: Link> {
    client: ApiClient,
    state: watch::Sender<AssociationState<L::Secondary>>,
}

impl<L: Link> AssociationController<L> {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(AssociationState::default());
        Self { client, state }
    }

    pub fn snapshot(&self) -> AssociationState<L::Secondary> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AssociationState<L::Secondary>> {
        self.state.subscribe()
    }

    pub fn primary(&self) -> Option<EntityId> {
        self.state.borrow().primary.clone()
    }

    pub fn linked(&self) -> Vec<L::Secondary> {
        self.state.borrow().linked.clone()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.state.borrow().error.clone()
    }

    /// Point the controller at a primary entity and fetch its list fresh.
    ///
    /// Re-selecting the current primary is a no-op; use [`refresh`](Self::refresh)
    /// to force a re-fetch. A blank id clears the controller.
    pub async fn set_primary(&self, primary: EntityId) -> Result<(), ApiError> {
        if self.state.borrow().primary.as_ref() == Some(&primary) {
            return Ok(());
        }
        if primary.is_blank() {
            self.state.send_replace(AssociationState::default());
            return Ok(());
        }

        self.state.send_replace(AssociationState {
            primary: Some(primary),
            ..AssociationState::default()
        });
        self.refresh().await
    }

    /// Re-fetch the association list for the current primary.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let Some(primary) = self.primary() else {
            return Ok(());
        };
        self.begin();
        let result = self.resync(&primary).await;
        self.finish(result)
    }

    /// Link `secondary` to the current primary, then re-sync.
    pub async fn assign(&self, secondary: &EntityId) -> Result<(), ApiError> {
        let Some(primary) = self.target(secondary) else {
            return Ok(());
        };
        self.begin();
        info!(
            primary = %primary,
            secondary = %secondary,
            "assigning {} to {}",
            <L::Secondary as Entity>::NOUN,
            <L::Primary as Entity>::NOUN
        );
        let result = match self.client.link::<L>(&primary, secondary).await {
            Ok(()) => self.resync(&primary).await,
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    /// Unlink `secondary` from the current primary, then re-sync.
    pub async fn remove(&self, secondary: &EntityId) -> Result<(), ApiError> {
        let Some(primary) = self.target(secondary) else {
            return Ok(());
        };
        self.begin();
        info!(
            primary = %primary,
            secondary = %secondary,
            "removing {} from {}",
            <L::Secondary as Entity>::NOUN,
            <L::Primary as Entity>::NOUN
        );
        let result = match self.client.unlink::<L>(&primary, secondary).await {
            Ok(()) => self.resync(&primary).await,
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    /// Entries of the global cache not yet linked to the primary, in cache order.
    ///
    /// Only as complete as the store: an unfetched store yields nothing.
    pub fn assignable(&self, store: &EntityStore<L::Secondary>) -> Vec<L::Secondary> {
        let state = self.state.borrow();
        store
            .items()
            .into_iter()
            .filter(|candidate| !state.linked.iter().any(|l| l.id() == candidate.id()))
            .collect()
    }

    // ── internals ─────────────────────────────────────────────────────────────

    fn target(&self, secondary: &EntityId) -> Option<EntityId> {
        if secondary.is_blank() {
            return None;
        }
        self.primary().filter(|p| !p.is_blank())
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    async fn resync(&self, primary: &EntityId) -> Result<(), ApiError> {
        let linked = self.client.linked::<L>(primary).await?;
        debug!(primary = %primary, count = linked.len(), "association list re-synced");
        self.state.send_modify(|s| {
            // A later set_primary may have moved on while this request was in flight.
            if s.primary.as_ref() == Some(primary) {
                s.linked = linked;
            }
        });
        Ok(())
    }

    fn finish(&self, result: Result<(), ApiError>) -> Result<(), ApiError> {
        match result {
            Ok(()) => {
                self.state.send_modify(|s| s.loading = false);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "association operation failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, primary: &str, linked: Vec<L::Secondary>) {
        self.state.send_modify(|s| {
            s.primary = Some(EntityId::from(primary));
            s.linked = linked;
        });
    }
}
