//! `/workflow/:agencyId`: read-only graph of one agency.

use std::fmt::Write as _;

use crate::api::ApiClient;
use crate::api::types::EntityId;
use crate::error::ApiError;
use crate::workflow::WorkflowViewer;

pub struct WorkflowPage<'a> {
    client: &'a ApiClient,
    agency_id: EntityId,
    pub viewer: WorkflowViewer,
}

impl<'a> WorkflowPage<'a> {
    pub fn new(client: &'a ApiClient, agency_id: EntityId) -> Self {
        Self { client, agency_id, viewer: WorkflowViewer::new() }
    }

    pub async fn mount(&mut self) -> Result<(), ApiError> {
        self.viewer.load(self.client, &self.agency_id).await
    }

    pub fn render(&self) -> String {
        if self.viewer.is_loading() {
            return "Loading workflow...\n".to_string();
        }
        if let Some(e) = self.viewer.error() {
            return format!("Error loading workflow: {e}\n");
        }

        let mut out = String::new();
        let _ = writeln!(out, "Back to Agency Details (/agencies/{})", self.agency_id);
        let _ = writeln!(out, "# Workflow for: {}", self.viewer.title());

        let _ = writeln!(out, "\n## Nodes ({})", self.viewer.nodes().len());
        for node in self.viewer.nodes() {
            let label = node.label().unwrap_or(&node.id);
            let _ = writeln!(
                out,
                "- [{}] {} @ ({}, {})",
                node.id, label, node.position.x, node.position.y
            );
        }

        let _ = writeln!(out, "\n## Edges ({})", self.viewer.edges().len());
        for edge in self.viewer.edges() {
            let _ = writeln!(out, "- {}: {} -> {}", edge.id, edge.source, edge.target);
        }
        out
    }
}
