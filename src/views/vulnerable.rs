//! Vulnerable individuals screen: directory table, registration/edit form,
//! bulk delete, CSV export

use std::sync::Arc;

use chrono::Utc;

use crate::api::ApiClient;
use crate::auth::FieldError;
use crate::error::AppError;
use crate::listing::{self, Page, Selection};
use crate::models::{Address, Gender, Vulnerabilities, VulnerableIndividual, VulnerableSummary};
use crate::validation;

use super::{BulkDeleteReport, ITEMS_PER_PAGE};

/// What a successful submit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated,
}

/// Editable state of the registration / edit dialog
#[derive(Debug, Clone, Default)]
pub struct VulnerableForm {
    /// Id of the record being edited; `None` while registering
    editing: Option<String>,
    pub user_id: String,
    pub name: String,
    pub gender: Gender,
    /// YYYY-MM-DD, as typed
    pub birth_date: String,
    pub phone_number: String,
    pub state: String,
    pub city: String,
    pub address1: String,
    pub address2: String,
    pub summary: String,
    /// Risk/desire details ride along unchanged; they are maintained by the
    /// consultation engine, not this form
    vulnerabilities: Option<Vulnerabilities>,
}

impl VulnerableForm {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_record(record: VulnerableIndividual) -> Self {
        let summary = record
            .vulnerabilities
            .as_ref()
            .and_then(|v| v.summary.clone())
            .unwrap_or_default();
        Self {
            editing: Some(record.user_id.clone()),
            user_id: record.user_id,
            name: record.name,
            gender: record.gender,
            birth_date: record.birth_date.format("%Y-%m-%d").to_string(),
            phone_number: record.phone_number,
            state: record.address.state,
            city: record.address.city,
            address1: record.address.address1,
            address2: record.address.address2.unwrap_or_default(),
            summary,
            vulnerabilities: record.vulnerabilities,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_non_empty(&self.name, "Name") {
            errors.push(FieldError::from_validation("name", e));
        }
        if let Err(e) = validation::validate_birth_date(&self.birth_date) {
            errors.push(FieldError::from_validation("birth_date", e));
        }
        if let Err(e) = validation::validate_phone(&self.phone_number) {
            errors.push(FieldError::from_validation("phone_number", e));
        }
        if let Err(e) =
            validation::validate_text_size(&self.summary, "Summary", validation::MAX_TEXT_BYTES)
        {
            errors.push(FieldError::from_validation("summary", e));
        }
        errors
    }

    /// Build the wire record; call after `validate` comes back clean
    fn to_record(&self) -> Result<VulnerableIndividual, AppError> {
        let birth_date = validation::validate_birth_date(&self.birth_date)
            .map_err(AppError::from)?;

        let mut vulnerabilities = self.vulnerabilities.clone().unwrap_or_default();
        vulnerabilities.summary = if self.summary.trim().is_empty() {
            None
        } else {
            Some(self.summary.trim().to_string())
        };

        Ok(VulnerableIndividual {
            user_id: self.user_id.trim().to_string(),
            name: self.name.trim().to_string(),
            gender: self.gender,
            birth_date,
            phone_number: self.phone_number.trim().to_string(),
            address: Address {
                state: self.state.trim().to_string(),
                city: self.city.trim().to_string(),
                address1: self.address1.trim().to_string(),
                address2: if self.address2.trim().is_empty() {
                    None
                } else {
                    Some(self.address2.trim().to_string())
                },
            },
            vulnerabilities: Some(vulnerabilities),
            last_consultation_id: None,
        })
    }
}

/// Directory screen controller
pub struct VulnerableDirectory {
    api: Arc<ApiClient>,
    rows: Vec<VulnerableSummary>,
    pub search_term: String,
    pub page: usize,
    pub selection: Selection,
}

impl VulnerableDirectory {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            rows: Vec::new(),
            search_term: String::new(),
            page: 1,
            selection: Selection::new(),
        }
    }

    /// Re-fetch the collection
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.rows = self.api.vulnerable_list().await?;
        // Drop selected ids that no longer exist
        let ids: std::collections::BTreeSet<&str> =
            self.rows.iter().map(|r| r.user_id.as_str()).collect();
        for id in self.selection.ids() {
            if !ids.contains(id.as_str()) {
                self.selection.remove(&id);
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> &[VulnerableSummary] {
        &self.rows
    }

    /// Changing the search resets to the first page
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 1;
    }

    fn filtered(&self) -> Vec<VulnerableSummary> {
        listing::filter_by(&self.rows, &self.search_term, |row| {
            vec![
                row.name.clone(),
                row.user_id.clone(),
                row.phone_number.clone(),
                row.summary.clone().unwrap_or_default(),
            ]
        })
    }

    /// The rows of the current page under the current filter
    pub fn visible(&self) -> Page<VulnerableSummary> {
        listing::paginate(&self.filtered(), self.page, ITEMS_PER_PAGE)
    }

    pub fn toggle_selected(&mut self, user_id: &str, selected: bool) {
        self.selection.toggle(user_id, selected);
    }

    /// Select-all works over the filtered collection, not just the page
    pub fn select_all_filtered(&mut self, selected: bool) {
        if selected {
            self.selection
                .select_all(self.filtered().into_iter().map(|r| r.user_id));
        } else {
            self.selection.clear();
        }
    }

    pub fn open_new(&self) -> VulnerableForm {
        VulnerableForm::empty()
    }

    /// Populate the edit form from the full record
    pub async fn open_edit(&self, user_id: &str) -> Result<VulnerableForm, AppError> {
        let record = self.api.vulnerable(user_id).await?;
        Ok(VulnerableForm::from_record(record))
    }

    /// Create or update depending on how the form was opened, then refresh
    /// the collection exactly once
    pub async fn submit(&mut self, form: &VulnerableForm) -> Result<SubmitOutcome, AppError> {
        let errors = form.validate();
        if let Some(first) = errors.into_iter().next() {
            return Err(first.into_app_error());
        }
        let record = form.to_record()?;

        let outcome = match &form.editing {
            Some(user_id) => {
                self.api.update_vulnerable(user_id, &record).await?;
                SubmitOutcome::Updated
            }
            None => {
                self.api.create_vulnerable(&record).await?;
                SubmitOutcome::Created
            }
        };
        self.refresh().await?;
        Ok(outcome)
    }

    /// Delete each id in turn and report per-id outcomes, then refresh once.
    /// A failure on one id does not stop the rest.
    pub async fn delete(&mut self, user_ids: &[String]) -> Result<BulkDeleteReport, AppError> {
        let mut report = BulkDeleteReport::default();
        for user_id in user_ids {
            match self.api.delete_vulnerable(user_id).await {
                Ok(()) => report.deleted.push(user_id.clone()),
                Err(e) => {
                    tracing::warn!("delete failed for {}: {}", user_id, e);
                    report.failed.push((user_id.clone(), e.to_string()));
                }
            }
            self.selection.remove(user_id);
        }
        self.refresh().await?;
        Ok(report)
    }

    /// CSV of the filtered rows, displayed fields only
    pub fn export_csv(&self) -> String {
        let today = Utc::now().date_naive();
        let mut out = String::from(
            "user_id,name,gender,age,location,phone_number,risk_count,desire_count,summary\n",
        );
        for row in self.filtered() {
            let age = row
                .age_on(today)
                .map(|a| a.to_string())
                .unwrap_or_default();
            let gender = match row.gender {
                Gender::Male => "M",
                Gender::Female => "F",
                Gender::Other => "O",
            };
            let location = row.address.summary();
            let risks = row.risk_list_size.to_string();
            let desires = row.desire_list_size.to_string();
            let fields = [
                row.user_id.as_str(),
                row.name.as_str(),
                gender,
                age.as_str(),
                location.as_str(),
                row.phone_number.as_str(),
                risks.as_str(),
                desires.as_str(),
                row.summary.as_deref().unwrap_or(""),
            ]
            .map(csv_escape);
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
