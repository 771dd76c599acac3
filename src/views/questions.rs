//! Question set screen: list plus the flow editor
//!
//! A question set is an ordered flow of prompt steps; each step carries the
//! responses the engine should expect, and each expected response can be
//! tagged with the risk/desire/exception/deep-dive types it maps to. All
//! nested edits are index-addressed.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::FieldError;
use crate::error::AppError;
use crate::listing::{self, Page, Selection};
use crate::models::{ExpectedResponse, QuestionSet, QuestionStep, ResponseCategory, ResponseTag};
use crate::validation;

use super::{BulkDeleteReport, ITEMS_PER_PAGE};

/// Editable state of the question set dialog
#[derive(Debug, Clone)]
pub struct QuestionSetForm {
    editing: Option<String>,
    pub title: String,
    pub version: u32,
    pub flow: Vec<QuestionStep>,
}

impl QuestionSetForm {
    pub fn empty() -> Self {
        Self {
            editing: None,
            title: String::new(),
            version: 1,
            // Start with one blank step; a set with no questions is useless
            flow: vec![QuestionStep::default()],
        }
    }

    pub fn from_record(record: QuestionSet) -> Self {
        Self {
            editing: Some(record.questions_id.clone()),
            title: record.title,
            version: record.version,
            flow: record.flow,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    // --- index-addressed flow editing -------------------------------------

    pub fn add_step(&mut self) {
        self.flow.push(QuestionStep::default());
    }

    pub fn remove_step(&mut self, step: usize) {
        if step < self.flow.len() {
            self.flow.remove(step);
        }
    }

    pub fn set_step_text(&mut self, step: usize, text: impl Into<String>) {
        if let Some(s) = self.flow.get_mut(step) {
            s.text = text.into();
        }
    }

    pub fn add_expected_response(&mut self, step: usize) {
        if let Some(s) = self.flow.get_mut(step) {
            s.expected_response.push(ExpectedResponse::default());
        }
    }

    pub fn remove_expected_response(&mut self, step: usize, response: usize) {
        if let Some(s) = self.flow.get_mut(step) {
            if response < s.expected_response.len() {
                s.expected_response.remove(response);
            }
        }
    }

    pub fn set_response_text(&mut self, step: usize, response: usize, text: impl Into<String>) {
        if let Some(r) = self
            .flow
            .get_mut(step)
            .and_then(|s| s.expected_response.get_mut(response))
        {
            r.text = text.into();
        }
    }

    /// Toggle one type tag on an expected response: present -> removed,
    /// absent -> added
    pub fn toggle_response_tag(
        &mut self,
        step: usize,
        response: usize,
        category: ResponseCategory,
        index: u8,
    ) {
        let Some(r) = self
            .flow
            .get_mut(step)
            .and_then(|s| s.expected_response.get_mut(response))
        else {
            return;
        };
        let tags = r.response_type_list.get_or_insert_with(Vec::new);
        let tag = ResponseTag {
            response_type: category,
            response_index: index,
        };
        if let Some(pos) = tags.iter().position(|t| *t == tag) {
            tags.remove(pos);
        } else {
            tags.push(tag);
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_non_empty(&self.title, "Title") {
            errors.push(FieldError::from_validation("title", e));
        }
        if self.flow.is_empty() {
            errors.push(FieldError {
                field: "flow",
                message: "A question set needs at least one question".to_string(),
            });
        }
        if self.flow.iter().any(|s| s.text.trim().is_empty()) {
            errors.push(FieldError {
                field: "flow",
                message: "Every question needs prompt text".to_string(),
            });
        }
        errors
    }

    fn to_record(&self) -> QuestionSet {
        QuestionSet {
            questions_id: self.editing.clone().unwrap_or_default(),
            title: self.title.trim().to_string(),
            time: None,
            version: self.version,
            flow: self.flow.clone(),
        }
    }
}

/// Question set list controller
pub struct QuestionBank {
    api: Arc<ApiClient>,
    sets: Vec<QuestionSet>,
    pub search_term: String,
    pub page: usize,
    pub selection: Selection,
}

impl QuestionBank {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            sets: Vec::new(),
            search_term: String::new(),
            page: 1,
            selection: Selection::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.sets = self.api.question_list().await?;
        Ok(())
    }

    pub fn sets(&self) -> &[QuestionSet] {
        &self.sets
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 1;
    }

    fn filtered(&self) -> Vec<QuestionSet> {
        listing::filter_by(&self.sets, &self.search_term, |set| {
            vec![set.title.clone(), set.questions_id.clone()]
        })
    }

    pub fn visible(&self) -> Page<QuestionSet> {
        listing::paginate(&self.filtered(), self.page, ITEMS_PER_PAGE)
    }

    pub fn open_new(&self) -> QuestionSetForm {
        QuestionSetForm::empty()
    }

    pub async fn open_edit(&self, id: &str) -> Result<QuestionSetForm, AppError> {
        let record = self.api.question_set(id).await?;
        Ok(QuestionSetForm::from_record(record))
    }

    pub async fn submit(&mut self, form: &QuestionSetForm) -> Result<(), AppError> {
        let errors = form.validate();
        if let Some(first) = errors.into_iter().next() {
            return Err(first.into_app_error());
        }
        let record = form.to_record();
        match &form.editing {
            Some(id) => self.api.update_question_set(id, &record).await?,
            None => self.api.create_question_set(&record).await?,
        }
        self.refresh().await
    }

    pub async fn delete(&mut self, ids: &[String]) -> Result<BulkDeleteReport, AppError> {
        let mut report = BulkDeleteReport::default();
        for id in ids {
            match self.api.delete_question_set(id).await {
                Ok(()) => report.deleted.push(id.clone()),
                Err(e) => {
                    tracing::warn!("delete failed for question set {}: {}", id, e);
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
            self.selection.remove(id);
        }
        self.refresh().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_editing() {
        let mut form = QuestionSetForm::empty();
        assert_eq!(form.flow.len(), 1);

        form.set_step_text(0, "요즘 건강은 어떠세요?");
        form.add_expected_response(0);
        form.set_response_text(0, 0, "아파요");
        form.add_step();
        form.set_step_text(1, "식사는 잘 하고 계세요?");

        assert_eq!(form.flow[0].text, "요즘 건강은 어떠세요?");
        assert_eq!(form.flow[0].expected_response[0].text, "아파요");
        assert_eq!(form.flow.len(), 2);

        form.remove_step(0);
        assert_eq!(form.flow[0].text, "식사는 잘 하고 계세요?");
    }

    #[test]
    fn test_out_of_range_edits_are_noops() {
        let mut form = QuestionSetForm::empty();
        form.set_step_text(5, "nope");
        form.remove_step(5);
        form.set_response_text(0, 5, "nope");
        form.remove_expected_response(0, 5);
        assert_eq!(form.flow.len(), 1);
        assert!(form.flow[0].text.is_empty());
    }

    #[test]
    fn test_tag_toggle() {
        let mut form = QuestionSetForm::empty();
        form.add_expected_response(0);

        form.toggle_response_tag(0, 0, ResponseCategory::Risk, 6);
        let tags = form.flow[0].expected_response[0]
            .response_type_list
            .as_ref()
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].response_index, 6);

        // Toggling again removes it
        form.toggle_response_tag(0, 0, ResponseCategory::Risk, 6);
        assert!(form.flow[0].expected_response[0]
            .response_type_list
            .as_ref()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_validation() {
        let mut form = QuestionSetForm::empty();
        // Empty title and blank step text
        assert_eq!(form.validate().len(), 2);

        form.title = "겨울철 안부 확인".to_string();
        form.set_step_text(0, "안녕하세요?");
        assert!(form.validate().is_empty());

        form.flow.clear();
        assert!(form.validate().iter().any(|e| e.field == "flow"));
    }
}
