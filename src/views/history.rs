//! Call history screen
//!
//! Unlike the client-paged tables, history is paged by the backend:
//! page/size/sort/searchTerm ride on the query string and the response is a
//! page envelope.

use std::sync::Arc;

use crate::api::{ApiClient, HistoryQuery};
use crate::error::AppError;
use crate::models::{CallHistoryRow, CallLog};

pub struct CallHistoryView {
    api: Arc<ApiClient>,
    pub query: HistoryQuery,
    rows: Vec<CallHistoryRow>,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl CallHistoryView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            query: HistoryQuery::default(),
            rows: Vec::new(),
            total_pages: 0,
            total_elements: 0,
        }
    }

    /// Fetch the current page
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let envelope = self.api.call_history(&self.query).await?;
        self.rows = envelope.content;
        self.total_pages = envelope.total_pages;
        self.total_elements = envelope.total_elements;
        Ok(())
    }

    pub fn rows(&self) -> &[CallHistoryRow] {
        &self.rows
    }

    /// Changing the search resets to the first page; `refresh` applies it
    pub fn set_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        self.query.search_term = if term.trim().is_empty() {
            None
        } else {
            Some(term)
        };
        self.query.page = 0;
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.page = page;
    }

    /// Full record for the detail dialog
    pub async fn detail(&self, id: &str) -> Result<CallLog, AppError> {
        Ok(self.api.call_log(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::session::SessionStore;

    fn view() -> CallHistoryView {
        let api = ApiClient::new(
            &AppConfig::default(),
            Arc::new(SessionStore::ephemeral()),
        )
        .unwrap();
        CallHistoryView::new(Arc::new(api))
    }

    #[test]
    fn test_set_search_resets_page() {
        let mut v = view();
        v.set_page(3);
        v.set_search("김영희");
        assert_eq!(v.query.page, 0);
        assert_eq!(v.query.search_term.as_deref(), Some("김영희"));
    }

    #[test]
    fn test_blank_search_clears_term() {
        let mut v = view();
        v.set_search("something");
        v.set_search("   ");
        assert_eq!(v.query.search_term, None);
    }
}
