//! Statistics and dashboard screen
//!
//! Pulls the whole history (ids first, then the details fan-out) and reduces
//! it client-side; the dashboard prefers the backend's pre-aggregated
//! summary and falls back to the same reduction.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use crate::api::{ApiClient, HistoryQuery};
use crate::error::AppError;
use crate::models::CallLog;
use crate::stats::{self, CallStats, DashboardSummary, TypeCount};
use crate::taxonomy;

/// How many logs one statistics load will consider
const HISTORY_FETCH_SIZE: u32 = 1000;
/// Rows shown in the top-type tables
pub const TOP_TYPES: usize = 5;

pub struct StatisticsView {
    api: Arc<ApiClient>,
    logs: Vec<CallLog>,
    /// `None` means all rounds
    pub selected_round: Option<u32>,
}

impl StatisticsView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            logs: Vec::new(),
            selected_round: None,
        }
    }

    /// Fetch the history ids, then every detail concurrently (the
    /// collections are small; no fan-out cap). Any failed detail fails the
    /// load, like the screen this replaces.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let query = HistoryQuery {
            page: 0,
            size: HISTORY_FETCH_SIZE,
            sort: "time,desc".to_string(),
            search_term: None,
        };
        let envelope = self.api.call_history(&query).await?;

        let fetches = envelope
            .content
            .iter()
            .map(|row| self.api.call_log(&row.id));
        let details = join_all(fetches).await;

        let mut logs = Vec::with_capacity(details.len());
        for detail in details {
            logs.push(detail?);
        }
        self.logs = logs;
        Ok(())
    }

    pub fn logs(&self) -> &[CallLog] {
        &self.logs
    }

    /// Rounds available in the loaded history, for the round selector
    pub fn rounds(&self) -> Vec<u32> {
        stats::rounds(&self.logs)
    }

    /// Reduction of the logs under the current round filter
    pub fn stats(&self) -> CallStats {
        let filtered = stats::filter_round(&self.logs, self.selected_round);
        stats::reduce(&filtered)
    }

    pub fn top_risks(&self) -> Vec<TypeCount> {
        stats::top_types(
            &self.stats().aggregated_risk_counts,
            taxonomy::risk_label_or_unknown,
            TOP_TYPES,
        )
    }

    pub fn top_desires(&self) -> Vec<TypeCount> {
        stats::top_types(
            &self.stats().aggregated_desire_counts,
            taxonomy::desire_label_or_unknown,
            TOP_TYPES,
        )
    }

    /// Dashboard numbers: the summary endpoint when the backend has one,
    /// otherwise the client-side reduction over a fresh history load
    pub async fn dashboard(&mut self) -> Result<DashboardSummary, AppError> {
        match self.api.dashboard_summary().await {
            Ok(summary) => Ok(summary),
            Err(crate::api::ApiError::Unauthorized) => Err(AppError::unauthorized()),
            Err(e) => {
                tracing::debug!("summary endpoint unavailable, reducing client-side: {}", e);
                self.refresh().await?;
                Ok(DashboardSummary::from_logs(
                    &self.logs,
                    Utc::now().date_naive(),
                ))
            }
        }
    }
}
