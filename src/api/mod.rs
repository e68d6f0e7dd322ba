//! Thin REST client for the Nexus backend.
//!
//! One method per HTTP round trip; no caching, no retries. Every failure is
//! normalised to [`ApiError`] so the stores can keep it in their error slot.
//!
//! ```text
//! GET/POST            /{collection}
//! GET/PUT/DELETE      /{collection}/{id}
//! GET                 /{primary}/{id}/{secondary}
//! POST/DELETE         /{primary}/{id}/{secondary}/{secondary_id}
//! GET                 /workflow/{agency_id}
//! POST                /chat/a2a/ , /chat/mcp/
//! ```
//!
//! All paths are appended to the configured base URL.

pub mod chat;
pub mod types;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;
use types::{Agency, Agent, Entity, EntityId, Tool, Workflow};

// ── Association links ─────────────────────────────────────────────────────────

/// A many-to-many edge between two entity collections.
///
/// Both edges the backend exposes are nested under the primary resource:
/// `/{Primary::COLLECTION}/{id}/{Secondary::COLLECTION}`.
pub trait Link: Send + Sync + 'static {
    type Primary: Entity;
    type Secondary: Entity;
}

/// Agency ↔ Agent.
#[derive(Debug, Clone, Copy)]
pub struct AgencyAgents;

impl Link for AgencyAgents {
    type Primary = Agency;
    type Secondary = Agent;
}

/// Agent ↔ Tool.
#[derive(Debug, Clone, Copy)]
pub struct AgentTools;

impl Link for AgentTools {
    type Primary = Agent;
    type Secondary = Tool;
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    /// Build a client rooted at `base_url`.
    ///
    /// `timeout` is applied per request when set; without it a request waits
    /// for as long as the transport allows.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base_url}: not a base url")));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL. Segments are percent-encoded, so
    /// an opaque id can never escape its position in the path.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Generic CRUD ──────────────────────────────────────────────────────────

    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, ApiError> {
        let url = self.url(&[E::COLLECTION])?;
        fetch_json(self.client.get(url)).await
    }

    pub async fn get<E: Entity>(&self, id: &EntityId) -> Result<E, ApiError> {
        require(id, E::NOUN)?;
        let url = self.url(&[E::COLLECTION, id.as_str()])?;
        fetch_json(self.client.get(url)).await
    }

    pub async fn create<E: Entity>(&self, draft: &E::Draft) -> Result<E, ApiError> {
        let url = self.url(&[E::COLLECTION])?;
        fetch_json(self.client.post(url).json(draft)).await
    }

    /// PUT the full entity to its own path; the body includes the id.
    pub async fn update<E: Entity>(&self, entity: &E) -> Result<E, ApiError> {
        require(entity.id(), E::NOUN)?;
        let url = self.url(&[E::COLLECTION, entity.id().as_str()])?;
        fetch_json(self.client.put(url).json(entity)).await
    }

    pub async fn delete<E: Entity>(&self, id: &EntityId) -> Result<(), ApiError> {
        require(id, E::NOUN)?;
        let url = self.url(&[E::COLLECTION, id.as_str()])?;
        fetch_empty(self.client.delete(url)).await
    }

    // ── Associations ──────────────────────────────────────────────────────────

    /// Secondaries currently linked to `primary`.
    pub async fn linked<L: Link>(&self, primary: &EntityId) -> Result<Vec<L::Secondary>, ApiError> {
        require(primary, <L::Primary as Entity>::NOUN)?;
        let url = self.url(&[
            <L::Primary as Entity>::COLLECTION,
            primary.as_str(),
            <L::Secondary as Entity>::COLLECTION,
        ])?;
        fetch_json(self.client.get(url)).await
    }

    pub async fn link<L: Link>(&self, primary: &EntityId, secondary: &EntityId) -> Result<(), ApiError> {
        let url = self.link_url::<L>(primary, secondary)?;
        fetch_empty(self.client.post(url)).await
    }

    pub async fn unlink<L: Link>(&self, primary: &EntityId, secondary: &EntityId) -> Result<(), ApiError> {
        let url = self.link_url::<L>(primary, secondary)?;
        fetch_empty(self.client.delete(url)).await
    }

    fn link_url<L: Link>(&self, primary: &EntityId, secondary: &EntityId) -> Result<Url, ApiError> {
        require(primary, <L::Primary as Entity>::NOUN)?;
        require(secondary, <L::Secondary as Entity>::NOUN)?;
        self.url(&[
            <L::Primary as Entity>::COLLECTION,
            primary.as_str(),
            <L::Secondary as Entity>::COLLECTION,
            secondary.as_str(),
        ])
    }

    pub async fn agents_for_agency(&self, agency_id: &EntityId) -> Result<Vec<Agent>, ApiError> {
        self.linked::<AgencyAgents>(agency_id).await
    }

    pub async fn assign_agent_to_agency(&self, agency_id: &EntityId, agent_id: &EntityId) -> Result<(), ApiError> {
        self.link::<AgencyAgents>(agency_id, agent_id).await
    }

    pub async fn remove_agent_from_agency(&self, agency_id: &EntityId, agent_id: &EntityId) -> Result<(), ApiError> {
        self.unlink::<AgencyAgents>(agency_id, agent_id).await
    }

    pub async fn tools_for_agent(&self, agent_id: &EntityId) -> Result<Vec<Tool>, ApiError> {
        self.linked::<AgentTools>(agent_id).await
    }

    pub async fn assign_tool_to_agent(&self, agent_id: &EntityId, tool_id: &EntityId) -> Result<(), ApiError> {
        self.link::<AgentTools>(agent_id, tool_id).await
    }

    pub async fn remove_tool_from_agent(&self, agent_id: &EntityId, tool_id: &EntityId) -> Result<(), ApiError> {
        self.unlink::<AgentTools>(agent_id, tool_id).await
    }

    // ── Workflow ──────────────────────────────────────────────────────────────

    pub async fn get_workflow(&self, agency_id: &EntityId) -> Result<Workflow, ApiError> {
        require(agency_id, "agency")?;
        let url = self.url(&["workflow", agency_id.as_str()])?;
        fetch_json(self.client.get(url)).await
    }
}

// ── Request helpers ───────────────────────────────────────────────────────────

fn require(id: &EntityId, noun: &str) -> Result<(), ApiError> {
    if id.is_blank() {
        return Err(ApiError::MissingParam(format!("{noun} id")));
    }
    Ok(())
}

async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let (client, request) = req.build_split();
    let request = request?;
    let method = request.method().clone();
    let url = request.url().clone();
    debug!(%method, %url, "backend request");

    let response = client.execute(request).await.map_err(|e| {
        warn!(%method, %url, error = %e, "backend request failed (transport)");
        ApiError::from(e)
    })?;

    check_status(response).await
}

async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
    let response = send(req).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

async fn fetch_empty(req: RequestBuilder) -> Result<(), ApiError> {
    send(req).await.map(|_| ())
}

/// Turn a non-success response into [`ApiError::Status`], preferring the
/// backend's own `detail` / `message` field as the human-readable text.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());

    warn!(status = status.as_u16(), %message, "backend returned error status");
    Err(ApiError::Status { status: status.as_u16(), message })
}

fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(str::to_string),
        Err(_) => Some(trimmed.to_string()),
    }
}
