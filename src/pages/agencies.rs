//! `/agencies`: agency list with a create form.

use std::fmt::Write as _;

use tracing::warn;

use super::AgencyForm;
use crate::api::types::Agency;
use crate::error::ApiError;
use crate::store::AgencyStore;

pub struct AgenciesPage<'a> {
    agencies: &'a AgencyStore,
    pub form: AgencyForm,
}

impl<'a> AgenciesPage<'a> {
    pub fn new(agencies: &'a AgencyStore) -> Self {
        Self { agencies, form: AgencyForm::default() }
    }

    /// Fetch the agency list. The outcome is also visible through [`render`](Self::render).
    pub async fn mount(&self) -> Result<(), ApiError> {
        self.agencies.fetch_all().await
    }

    /// Create an agency from the form.
    ///
    /// A blank name sends nothing and returns `Ok(None)`. On success the form
    /// is cleared; on failure it keeps the input.
    pub async fn submit_create(&mut self) -> Result<Option<Agency>, ApiError> {
        let Some(draft) = self.form.draft() else {
            return Ok(None);
        };
        match self.agencies.create(draft).await {
            Ok(agency) => {
                self.form = AgencyForm::default();
                Ok(Some(agency))
            }
            Err(e) => {
                warn!(error = %e, "failed to create agency");
                Err(e)
            }
        }
    }

    pub fn render(&self) -> String {
        let state = self.agencies.snapshot();
        if state.loading {
            return "Loading agencies...\n".to_string();
        }
        if let Some(e) = &state.error {
            return format!("Error loading agencies: {e}\n");
        }

        let mut out = String::from("# Agencies\n\n## Existing Agencies\n");
        if state.items.is_empty() {
            out.push_str("No agencies found.\n");
            return out;
        }
        for agency in &state.items {
            let _ = write!(out, "- {}", agency.name);
            if let Some(d) = agency.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = write!(out, " - {d}");
            }
            let _ = writeln!(out, "  (/agencies/{})", agency.id);
        }
        out
    }
}
