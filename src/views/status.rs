//! Live consultation status screen
//!
//! Merges the active-items snapshot with the event stream into one board.
//! The subscription lives exactly as long as the screen: attach on entry,
//! detach on leave, and nothing applies after detach.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::queue::{ConsultationQueueItem, QueueSummary, StatusBoard};
use crate::stream::{StatusStream, StreamEvent};

pub struct StatusView {
    api: Arc<ApiClient>,
    board: StatusBoard,
    stream: Option<StatusStream>,
}

impl StatusView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            board: StatusBoard::new(),
            stream: None,
        }
    }

    /// Fetch the snapshot and open the stream. Either source may land its
    /// data first; the board reconciles per id.
    pub async fn attach(&mut self, admin_id: &str) -> Result<(), AppError> {
        let stream = self.api.open_status_stream(admin_id).await?;
        self.stream = Some(stream);

        let snapshot = self.api.active_calls().await?;
        self.board.load_snapshot(snapshot);
        Ok(())
    }

    /// Seed rows the planner just requested (waiting until the backend says
    /// otherwise)
    pub fn seed(&mut self, items: Vec<ConsultationQueueItem>) {
        for item in items {
            self.board.apply(item);
        }
    }

    /// Apply everything the stream has delivered, without blocking
    pub fn pump(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        while let Some(event) = stream.try_recv() {
            match event {
                StreamEvent::Update(item) => {
                    self.board.apply(item);
                }
                StreamEvent::Closed => {
                    tracing::warn!("status stream closed; no further live updates");
                    self.stream = None;
                    return;
                }
            }
        }
    }

    /// Await the next stream delivery and apply it. `false` once the stream
    /// is gone.
    pub async fn next_update(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.recv().await {
            Some(StreamEvent::Update(item)) => {
                self.board.apply(item);
                true
            }
            Some(StreamEvent::Closed) | None => {
                self.stream = None;
                false
            }
        }
    }

    /// Whether live updates are still flowing
    pub fn is_live(&self) -> bool {
        self.stream.as_ref().map(StatusStream::is_connected).unwrap_or(false)
    }

    pub fn items(&self) -> &[ConsultationQueueItem] {
        self.board.items()
    }

    pub fn summary(&self) -> QueueSummary {
        self.board.summary()
    }

    /// Close the subscription; late deliveries become no-ops
    pub fn detach(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}

impl Drop for StatusView {
    fn drop(&mut self) {
        self.detach();
    }
}
