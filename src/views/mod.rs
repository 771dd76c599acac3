//! Screen controllers
//!
//! One controller per screen of the console, each owning its local state
//! (fetched rows, search term, page, selection, open form) and calling the
//! API client for every mutation. There is exactly one implementation of
//! each screen.

pub mod approvals;
pub mod consultations;
pub mod history;
pub mod questions;
pub mod statistics;
pub mod status;
pub mod vulnerable;

use serde::Serialize;

/// Rows shown per page in the client-paged tables
pub const ITEMS_PER_PAGE: usize = 10;

/// Per-id outcome of a bulk delete. The operation is not transactional;
/// this report is how partial success is surfaced precisely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    /// (id, error message)
    pub failed: Vec<(String, String)>,
}

impl BulkDeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.deleted.is_empty() && !self.failed.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}
