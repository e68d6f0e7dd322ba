//! Wire types shared by the API client, the stores and the pages.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Opaque backend-assigned identifier.
///
/// The backend's relational store issues integer keys while the console
/// treats ids as strings, so both JSON forms are accepted on input and the
/// string form is always sent back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => EntityId(s),
            Raw::Int(n) => EntityId(n.to_string()),
        })
    }
}

// ── Entity abstraction ────────────────────────────────────────────────────────

/// A top-level backend resource with its own CRUD collection.
///
/// `COLLECTION` is the path segment of the collection (`/agencies`), `NOUN`
/// is the singular used in log lines and messages.
pub trait Entity:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Creation payload: the entity without its id.
    type Draft: Serialize + fmt::Debug + Send + Sync;

    const COLLECTION: &'static str;
    const NOUN: &'static str;

    fn id(&self) -> &EntityId;
    fn name(&self) -> &str;
}

// ── Entities ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgency {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTool {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Entity for Agency {
    type Draft = NewAgency;
    const COLLECTION: &'static str = "agencies";
    const NOUN: &'static str = "agency";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Agent {
    type Draft = NewAgent;
    const COLLECTION: &'static str = "agents";
    const NOUN: &'static str = "agent";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Tool {
    type Draft = NewTool;
    const COLLECTION: &'static str = "tools";
    const NOUN: &'static str = "tool";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── Workflow graph ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Display payload, passed through to the diagram verbatim.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub position: Position,
}

impl Node {
    /// `data.label` when it is a string.
    pub fn label(&self) -> Option<&str> {
        self.data.get("label").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Read-only `{nodes, edges}` snapshot for one agency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
