//! Route table.
//!
//! ```text
//! /                                    → redirect to /agencies
//! /agencies                            → agency list
//! /agencies/{id}                       → agency details
//! /agencies/{agency_id}/agents/{id}    → agent details
//! /workflow/{agency_id}                → workflow graph
//! anything else                        → not found
//! ```

use std::fmt;

use crate::api::types::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Agencies,
    Agency { id: EntityId },
    Agent { agency_id: EntityId, agent_id: EntityId },
    Workflow { agency_id: EntityId },
    NotFound { path: String },
}

impl Route {
    /// Parse a path. `/` resolves to [`Route::Agencies`]; empty segments
    /// from repeated or trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] | ["agencies"] => Route::Agencies,
            ["agencies", id] => Route::Agency { id: EntityId::from(*id) },
            ["agencies", agency_id, "agents", agent_id] => Route::Agent {
                agency_id: EntityId::from(*agency_id),
                agent_id: EntityId::from(*agent_id),
            },
            ["workflow", agency_id] => Route::Workflow { agency_id: EntityId::from(*agency_id) },
            _ => Route::NotFound { path: path.to_string() },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Agencies => write!(f, "/agencies"),
            Route::Agency { id } => write!(f, "/agencies/{id}"),
            Route::Agent { agency_id, agent_id } => write!(f, "/agencies/{agency_id}/agents/{agent_id}"),
            Route::Workflow { agency_id } => write!(f, "/workflow/{agency_id}"),
            Route::NotFound { path } => f.write_str(path),
        }
    }
}
