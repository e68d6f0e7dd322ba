//! Bindings for the backend's chat protocol endpoints.
//!
//! `POST /chat/a2a/` delivers an agent-to-agent message, `POST /chat/mcp/`
//! invokes a registered tool by name. Both answer with an arbitrary JSON
//! object, which is returned untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, fetch_json};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2aMessage {
    pub sender_agent_id: i64,
    pub receiver_agent_id: i64,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpRequest {
    pub tool_name: String,
    pub args: Map<String, Value>,
}

impl ApiClient {
    pub async fn send_a2a(&self, message: &A2aMessage) -> Result<Map<String, Value>, ApiError> {
        let url = self.url(&["chat", "a2a", ""])?;
        fetch_json(self.client.post(url).json(message)).await
    }

    /// An unregistered tool comes back as a 404 whose message is the
    /// backend's `detail`.
    pub async fn call_mcp_tool(&self, request: &McpRequest) -> Result<Map<String, Value>, ApiError> {
        if request.tool_name.trim().is_empty() {
            return Err(ApiError::MissingParam("tool name".into()));
        }
        let url = self.url(&["chat", "mcp", ""])?;
        fetch_json(self.client.post(url).json(request)).await
    }
}
