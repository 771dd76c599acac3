//! Consultation queue state
//!
//! Each queue item tracks one requested call:
//! waiting -> in-progress -> {completed | failed}. Transitions are decided by
//! the backend; the board only reflects them. Two sources feed the same
//! board: an initial snapshot fetch and the live event stream, in whatever
//! order they arrive.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Queue item status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultationStatus {
    Waiting,
    InProgress,
    Completed,
    Failed,
}

impl ConsultationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConsultationStatus {
    type Err = String;

    // The stream has sent WAITING / IN_PROGRESS as well as the kebab forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "waiting" => Ok(Self::Waiting),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown consultation status: {}", other)),
        }
    }
}

impl Serialize for ConsultationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConsultationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Live tracked state of one consultation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationQueueItem {
    #[serde(alias = "vulnerableId")]
    pub v_id: String,
    #[serde(alias = "vulnerableName", default)]
    pub v_name: String,
    #[serde(alias = "questionSetId", default)]
    pub q_id: String,
    #[serde(alias = "questionSetTitle", default)]
    pub q_title: String,
    pub status: ConsultationStatus,
    #[serde(alias = "currentStep", default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(
        alias = "errorMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
    #[serde(
        alias = "estimatedWaitTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_wait_time: Option<String>,
    /// Monotonic update version stamped by the server when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl ConsultationQueueItem {
    /// A freshly requested consultation, before the backend has said anything
    pub fn waiting(v_id: &str, v_name: &str, q_id: &str, q_title: &str) -> Self {
        Self {
            v_id: v_id.to_string(),
            v_name: v_name.to_string(),
            q_id: q_id.to_string(),
            q_title: q_title.to_string(),
            status: ConsultationStatus::Waiting,
            current_step: None,
            error_message: None,
            estimated_wait_time: None,
            seq: None,
        }
    }
}

/// Result of applying one update to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New item appended
    Added,
    /// Existing item replaced in place
    Replaced,
    /// Update carried an older version than the held item and was dropped
    IgnoredStale,
}

/// Per-status counts plus the overall completion ratio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueSummary {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    /// Completion percentage: (completed + failed) / total
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.processed() as f64 / self.total as f64) * 100.0
    }
}

/// The reconciled queue collection, keyed by target id.
///
/// Snapshot rows and stream updates go through the same `apply` path, so the
/// outcome is independent of which source delivers an item first: an update
/// for a known id replaces it in place (preserving order), an unknown id is
/// appended. Last write wins per id, except that a versioned update older
/// than the held version is dropped.
#[derive(Debug, Default)]
pub struct StatusBoard {
    items: Vec<ConsultationQueueItem>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ConsultationQueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, v_id: &str) -> Option<&ConsultationQueueItem> {
        self.items.iter().find(|i| i.v_id == v_id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply a snapshot: every row goes through `apply`, so a stream update
    /// that arrived before the snapshot resolved is not clobbered blindly;
    /// the per-id rules decide.
    pub fn load_snapshot(&mut self, rows: Vec<ConsultationQueueItem>) {
        for row in rows {
            self.apply(row);
        }
    }

    /// Reconcile one update into the board
    pub fn apply(&mut self, update: ConsultationQueueItem) -> ApplyOutcome {
        match self.items.iter_mut().find(|i| i.v_id == update.v_id) {
            Some(existing) => {
                if let (Some(held), Some(incoming)) = (existing.seq, update.seq) {
                    if incoming < held {
                        return ApplyOutcome::IgnoredStale;
                    }
                }
                // An unversioned update keeps the held version so later
                // versioned updates stay comparable
                let seq = update.seq.or(existing.seq);
                *existing = ConsultationQueueItem { seq, ..update };
                ApplyOutcome::Replaced
            }
            None => {
                self.items.push(update);
                ApplyOutcome::Added
            }
        }
    }

    pub fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary {
            total: self.items.len(),
            ..QueueSummary::default()
        };
        for item in &self.items {
            match item.status {
                ConsultationStatus::Waiting => summary.waiting += 1,
                ConsultationStatus::InProgress => summary.in_progress += 1,
                ConsultationStatus::Completed => summary.completed += 1,
                ConsultationStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(v_id: &str, status: ConsultationStatus) -> ConsultationQueueItem {
        ConsultationQueueItem {
            status,
            ..ConsultationQueueItem::waiting(v_id, "name", "q-1", "기초 안부 질문")
        }
    }

    #[test]
    fn test_status_display_roundtrip() {
        for status in [
            ConsultationStatus::Waiting,
            ConsultationStatus::InProgress,
            ConsultationStatus::Completed,
            ConsultationStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<ConsultationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parses_server_spellings() {
        assert_eq!(
            "IN_PROGRESS".parse::<ConsultationStatus>().unwrap(),
            ConsultationStatus::InProgress
        );
        assert_eq!(
            "COMPLETED".parse::<ConsultationStatus>().unwrap(),
            ConsultationStatus::Completed
        );
        assert!("paused".parse::<ConsultationStatus>().is_err());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ConsultationStatus::Waiting.is_terminal());
        assert!(!ConsultationStatus::InProgress.is_terminal());
        assert!(ConsultationStatus::Completed.is_terminal());
        assert!(ConsultationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut board = StatusBoard::new();
        board.load_snapshot(vec![item("1", ConsultationStatus::Waiting)]);

        let outcome = board.apply(item("1", ConsultationStatus::InProgress));
        assert_eq!(outcome, ApplyOutcome::Replaced);
        assert_eq!(board.len(), 1);
        assert_eq!(board.get("1").unwrap().status, ConsultationStatus::InProgress);
    }

    #[test]
    fn test_unknown_id_is_appended() {
        let mut board = StatusBoard::new();
        board.load_snapshot(vec![item("1", ConsultationStatus::Waiting)]);

        let outcome = board.apply(item("2", ConsultationStatus::Waiting));
        assert_eq!(outcome, ApplyOutcome::Added);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_replacement_preserves_order() {
        let mut board = StatusBoard::new();
        for id in ["1", "2", "3"] {
            board.apply(item(id, ConsultationStatus::Waiting));
        }
        board.apply(item("2", ConsultationStatus::Completed));

        let order: Vec<&str> = board.items().iter().map(|i| i.v_id.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_stream_before_snapshot() {
        let mut board = StatusBoard::new();
        // Stream beats the snapshot fetch
        board.apply(item("1", ConsultationStatus::InProgress));
        board.load_snapshot(vec![
            item("1", ConsultationStatus::Waiting),
            item("2", ConsultationStatus::Waiting),
        ]);

        // Unversioned: last write wins, still exactly one entry per id
        assert_eq!(board.len(), 2);
        assert_eq!(board.get("1").unwrap().status, ConsultationStatus::Waiting);
    }

    #[test]
    fn test_stale_versioned_update_ignored() {
        let mut board = StatusBoard::new();
        let mut current = item("1", ConsultationStatus::InProgress);
        current.seq = Some(5);
        board.apply(current);

        let mut stale = item("1", ConsultationStatus::Waiting);
        stale.seq = Some(3);
        assert_eq!(board.apply(stale), ApplyOutcome::IgnoredStale);
        assert_eq!(board.get("1").unwrap().status, ConsultationStatus::InProgress);

        let mut fresh = item("1", ConsultationStatus::Completed);
        fresh.seq = Some(6);
        assert_eq!(board.apply(fresh), ApplyOutcome::Replaced);
        assert_eq!(board.get("1").unwrap().status, ConsultationStatus::Completed);
    }

    #[test]
    fn test_unversioned_update_keeps_held_seq() {
        let mut board = StatusBoard::new();
        let mut versioned = item("1", ConsultationStatus::Waiting);
        versioned.seq = Some(4);
        board.apply(versioned);

        board.apply(item("1", ConsultationStatus::InProgress));
        assert_eq!(board.get("1").unwrap().seq, Some(4));

        // A stale versioned update is still rejected afterwards
        let mut stale = item("1", ConsultationStatus::Waiting);
        stale.seq = Some(2);
        assert_eq!(board.apply(stale), ApplyOutcome::IgnoredStale);
    }

    #[test]
    fn test_summary_and_percent() {
        let mut board = StatusBoard::new();
        board.apply(item("1", ConsultationStatus::Waiting));
        board.apply(item("2", ConsultationStatus::InProgress));
        board.apply(item("3", ConsultationStatus::Completed));
        board.apply(item("4", ConsultationStatus::Failed));

        let summary = board.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.waiting, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed(), 2);
        assert!((summary.percent_complete() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_board_percent_is_zero() {
        let board = StatusBoard::new();
        assert_eq!(board.summary().percent_complete(), 0.0);
    }

    #[test]
    fn test_queue_item_decodes_stream_payload() {
        let raw = serde_json::json!({
            "vulnerableId": "v-1",
            "vulnerableName": "Kim",
            "questionSetTitle": "겨울철 안부 확인",
            "status": "IN_PROGRESS",
            "errorMessage": null
        });
        let item: ConsultationQueueItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.v_id, "v-1");
        assert_eq!(item.status, ConsultationStatus::InProgress);
        assert_eq!(item.error_message, None);
    }
}
