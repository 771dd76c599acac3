//! Consultation planner screen
//!
//! Filter the directory down to the people to call, stage them into the
//! roster, pick a question set, and fire the start request. The backend
//! queues the calls; progress arrives on the status screen.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::api::ApiClient;
use crate::error::AppError;
use crate::listing::{substring_match, Selection};
use crate::models::{Gender, QuestionSet, StartCallRequest, VulnerableSummary};
use crate::queue::ConsultationQueueItem;

/// Target search criteria. Keyword lists are comma-separated in the UI and
/// match against the vulnerability summary.
#[derive(Debug, Clone, Default)]
pub struct TargetFilters {
    pub name: String,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub gender: Option<Gender>,
    pub region: String,
    pub risk_keywords: Vec<String>,
    pub desire_keywords: Vec<String>,
}

impl TargetFilters {
    pub fn matches(&self, row: &VulnerableSummary, today: NaiveDate) -> bool {
        if !self.name.trim().is_empty() && !substring_match(&row.name, self.name.trim()) {
            return false;
        }

        if self.min_age.is_some() || self.max_age.is_some() {
            let Some(age) = row.age_on(today) else {
                return false;
            };
            if age < self.min_age.unwrap_or(0) || age > self.max_age.unwrap_or(u32::MAX) {
                return false;
            }
        }

        if let Some(gender) = self.gender {
            if row.gender != gender {
                return false;
            }
        }

        if !self.region.trim().is_empty() {
            let region = self.region.trim();
            let address = &row.address;
            if !(substring_match(&address.state, region)
                || substring_match(&address.city, region)
                || substring_match(&address.address1, region))
            {
                return false;
            }
        }

        for keywords in [&self.risk_keywords, &self.desire_keywords] {
            let keywords: Vec<&str> = keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                continue;
            }
            let summary = row.summary.as_deref().unwrap_or("");
            if !keywords.iter().any(|k| substring_match(summary, k)) {
                return false;
            }
        }

        true
    }
}

/// Comma-separated keyword field -> list
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct ConsultationPlanner {
    api: Arc<ApiClient>,
    targets: Vec<VulnerableSummary>,
    question_sets: Vec<QuestionSet>,
    pub filters: TargetFilters,
    /// Checked in the search results, not yet on the roster
    pub staged: Selection,
    /// The people the calls will go to
    pub roster: Selection,
    pub selected_question_set: Option<String>,
}

impl ConsultationPlanner {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            targets: Vec::new(),
            question_sets: Vec::new(),
            filters: TargetFilters::default(),
            staged: Selection::new(),
            roster: Selection::new(),
            selected_question_set: None,
        }
    }

    /// Fetch the directory and the available question sets
    pub async fn load(&mut self) -> Result<(), AppError> {
        self.targets = self.api.vulnerable_list().await?;
        self.question_sets = self.api.question_list().await?;
        Ok(())
    }

    pub fn question_sets(&self) -> &[QuestionSet] {
        &self.question_sets
    }

    /// Directory rows passing the current filters
    pub fn filtered(&self) -> Vec<&VulnerableSummary> {
        let today = Utc::now().date_naive();
        self.targets
            .iter()
            .filter(|row| self.filters.matches(row, today))
            .collect()
    }

    pub fn stage(&mut self, user_id: &str, selected: bool) {
        self.staged.toggle(user_id, selected);
    }

    pub fn stage_all(&mut self, selected: bool) {
        if selected {
            let ids: Vec<String> = self
                .filtered()
                .into_iter()
                .map(|r| r.user_id.clone())
                .collect();
            self.staged.select_all(ids);
        } else {
            self.staged.clear();
        }
    }

    /// Move everything staged onto the roster
    pub fn commit_staged(&mut self) {
        for id in self.staged.ids() {
            self.roster.toggle(&id, true);
        }
        self.staged.clear();
    }

    pub fn remove_from_roster(&mut self, user_id: &str) {
        self.roster.remove(user_id);
    }

    /// Request calls for the roster. Returns the waiting queue items to seed
    /// the status board with; the stream takes over from there.
    pub async fn start(&mut self, admin_id: &str) -> Result<Vec<ConsultationQueueItem>, AppError> {
        if self.roster.is_empty() {
            return Err(AppError::new(
                crate::error::ErrorCode::VALIDATION_EMPTY_INPUT,
                "Select at least one person to call",
                crate::error::ErrorCategory::Validation,
            ));
        }
        let Some(question_set_id) = self.selected_question_set.clone() else {
            return Err(AppError::new(
                crate::error::ErrorCode::VALIDATION_EMPTY_INPUT,
                "Select a question set",
                crate::error::ErrorCategory::Validation,
            ));
        };
        let Some(question_set) = self
            .question_sets
            .iter()
            .find(|qs| qs.questions_id == question_set_id)
        else {
            return Err(AppError::record_not_found(&question_set_id));
        };

        let ids = self.roster.ids();
        let request = StartCallRequest {
            vulnerable_ids: ids.clone(),
            question_set_id: question_set_id.clone(),
            admin_id: admin_id.to_string(),
        };
        self.api.start_call(&request).await?;
        tracing::info!(count = ids.len(), "consultation batch requested");

        let seeds = ids
            .iter()
            .filter_map(|id| self.targets.iter().find(|t| &t.user_id == id))
            .map(|target| {
                ConsultationQueueItem::waiting(
                    &target.user_id,
                    &target.name,
                    &question_set.questions_id,
                    &question_set.title,
                )
            })
            .collect();

        self.roster.clear();
        self.selected_question_set = None;
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(name: &str, birth: &str, gender: Gender, city: &str, summary: &str) -> VulnerableSummary {
        let gender = match gender {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        };
        serde_json::from_value(serde_json::json!({
            "user_id": name,
            "name": name,
            "gender": gender,
            "birth_date": birth,
            "address": {"state": "서울특별시", "city": city},
            "summary": summary
        }))
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_name_and_gender_filter() {
        let r = row("김영희", "1950-01-01", Gender::Female, "강남구", "");
        let mut filters = TargetFilters {
            name: "영희".to_string(),
            ..TargetFilters::default()
        };
        assert!(filters.matches(&r, today()));

        filters.gender = Some(Gender::Male);
        assert!(!filters.matches(&r, today()));
    }

    #[test]
    fn test_age_range_filter() {
        let r = row("이철수", "1950-01-01", Gender::Male, "서초구", "");
        let filters = TargetFilters {
            min_age: Some(70),
            max_age: Some(80),
            ..TargetFilters::default()
        };
        assert!(filters.matches(&r, today())); // 75

        let filters = TargetFilters {
            min_age: Some(80),
            ..TargetFilters::default()
        };
        assert!(!filters.matches(&r, today()));
    }

    #[test]
    fn test_missing_birth_date_fails_age_filter() {
        let mut r = row("박", "1950-01-01", Gender::Other, "종로구", "");
        r.birth_date = None;
        let filters = TargetFilters {
            min_age: Some(10),
            ..TargetFilters::default()
        };
        assert!(!filters.matches(&r, today()));
    }

    #[test]
    fn test_region_filter() {
        let r = row("김", "1950-01-01", Gender::Female, "강남구", "");
        let filters = TargetFilters {
            region: "강남".to_string(),
            ..TargetFilters::default()
        };
        assert!(filters.matches(&r, today()));

        let filters = TargetFilters {
            region: "부산".to_string(),
            ..TargetFilters::default()
        };
        assert!(!filters.matches(&r, today()));
    }

    #[test]
    fn test_keyword_filters_match_summary() {
        let r = row("김", "1950-01-01", Gender::Female, "강남구", "월세 체납, 실직 상태");
        let filters = TargetFilters {
            risk_keywords: parse_keywords("월세, 질병"),
            ..TargetFilters::default()
        };
        assert!(filters.matches(&r, today()));

        let filters = TargetFilters {
            risk_keywords: parse_keywords("질병"),
            ..TargetFilters::default()
        };
        assert!(!filters.matches(&r, today()));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_keywords("월세, 실직 , "), vec!["월세", "실직"]);
        assert!(parse_keywords("  ").is_empty());
    }
}
