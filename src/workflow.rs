//! Workflow viewer: one read-only graph snapshot per agency.
//!
//! The backend computes the nodes and edges; the viewer only holds them as
//! local view state. Drags, removals, selections and new connections change
//! that local copy and are never sent back. Reloading discards them.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::api::types::{Edge, EntityId, Node, Position, Workflow};
use crate::error::ApiError;

/// A change to a node coming from the diagram widget.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position { id: String, position: Position },
    Select { id: String, selected: bool },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Select { id: String, selected: bool },
    Remove { id: String },
}

#[derive(Debug, Default)]
pub struct WorkflowViewer {
    agency_id: Option<EntityId>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selected_nodes: HashSet<String>,
    selected_edges: HashSet<String>,
    loading: bool,
    error: Option<ApiError>,
}

impl WorkflowViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the snapshot for `agency_id`, replacing any local edits.
    ///
    /// A blank id fails without issuing a request.
    pub async fn load(&mut self, client: &ApiClient, agency_id: &EntityId) -> Result<(), ApiError> {
        self.agency_id = Some(agency_id.clone());
        self.error = None;
        self.selected_nodes.clear();
        self.selected_edges.clear();

        if agency_id.is_blank() {
            let e = ApiError::MissingParam("agency id".into());
            self.error = Some(e.clone());
            return Err(e);
        }

        self.loading = true;
        let result = client.get_workflow(agency_id).await;
        self.loading = false;

        match result {
            Ok(Workflow { nodes, edges }) => {
                debug!(agency = %agency_id, nodes = nodes.len(), edges = edges.len(), "workflow loaded");
                self.nodes = nodes;
                self.edges = edges;
                Ok(())
            }
            Err(e) => {
                warn!(agency = %agency_id, error = %e, "workflow load failed");
                self.nodes.clear();
                self.edges.clear();
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn agency_id(&self) -> Option<&EntityId> {
        self.agency_id.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_node_selected(&self, id: &str) -> bool {
        self.selected_nodes.contains(id)
    }

    pub fn is_edge_selected(&self, id: &str) -> bool {
        self.selected_edges.contains(id)
    }

    /// Graph heading: the first node's label, else `Agency {id}`.
    pub fn title(&self) -> String {
        self.nodes
            .first()
            .and_then(Node::label)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                let id = self.agency_id.as_ref().map(EntityId::as_str).unwrap_or_default();
                format!("Agency {id}")
            })
    }

    // ── Local edits ───────────────────────────────────────────────────────────

    /// Changes naming an unknown node are ignored.
    pub fn apply_node_changes(&mut self, changes: impl IntoIterator<Item = NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.position = position;
                    }
                }
                NodeChange::Select { id, selected } => {
                    if self.nodes.iter().any(|n| n.id == id) {
                        set_selected(&mut self.selected_nodes, id, selected);
                    }
                }
                NodeChange::Remove { id } => {
                    self.nodes.retain(|n| n.id != id);
                    let dropped: Vec<String> = self
                        .edges
                        .iter()
                        .filter(|e| e.source == id || e.target == id)
                        .map(|e| e.id.clone())
                        .collect();
                    self.edges.retain(|e| e.source != id && e.target != id);
                    for edge in dropped {
                        self.selected_edges.remove(&edge);
                    }
                    self.selected_nodes.remove(&id);
                }
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: impl IntoIterator<Item = EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    if self.edges.iter().any(|e| e.id == id) {
                        set_selected(&mut self.selected_edges, id, selected);
                    }
                }
                EdgeChange::Remove { id } => {
                    self.edges.retain(|e| e.id != id);
                    self.selected_edges.remove(&id);
                }
            }
        }
    }

    /// Draw a new edge between two existing nodes.
    ///
    /// Returns `false` when an endpoint is unknown or the same
    /// source → target edge already exists.
    pub fn connect(&mut self, source: &str, target: &str) -> bool {
        let known = |id: &str| self.nodes.iter().any(|n| n.id == id);
        if !known(source) || !known(target) {
            return false;
        }
        if self.edges.iter().any(|e| e.source == source && e.target == target) {
            return false;
        }
        self.edges.push(Edge {
            id: format!("edge-{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
        });
        true
    }
}

fn set_selected(set: &mut HashSet<String>, id: String, selected: bool) {
    if selected {
        set.insert(id);
    } else {
        set.remove(&id);
    }
}
