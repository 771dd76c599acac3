//! Live consultation status stream
//!
//! The backend pushes queue-item deltas over a one-directional
//! `text/event-stream` connection. The decoder here is incremental: bytes go
//! in as they arrive, complete events come out, regardless of where chunk
//! boundaries fall. The subscription is a scoped resource: closing (or
//! dropping) it aborts the reader task, so nothing can reach the caller
//! after teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{header, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ApiError;
use crate::queue::ConsultationQueueItem;

/// Event names the backend has used for queue-item deltas
const UPDATE_EVENTS: &[&str] = &["statusUpdate", "call-update", "message"];

const CHANNEL_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name; "message" when the server named none
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event_type: String,
    data_lines: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, get every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop(); // the \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            // Blank line dispatches the accumulated event; without data
            // there is nothing to dispatch
            if self.data_lines.is_empty() {
                self.event_type.clear();
                return None;
            }
            let event = SseEvent {
                event: if self.event_type.is_empty() {
                    "message".to_string()
                } else {
                    std::mem::take(&mut self.event_type)
                },
                data: self.data_lines.join("\n"),
                id: self.last_id.clone(),
            };
            self.event_type.clear();
            self.data_lines.clear();
            return Some(event);
        }

        if line.starts_with(':') {
            // Comment / keep-alive
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event_type = value.to_string(),
            "data" => self.data_lines.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            // "retry" and unknown fields are ignored; reconnection is not
            // this client's job
            _ => {}
        }
        None
    }
}

/// What the subscription delivers
#[derive(Debug)]
pub enum StreamEvent {
    Update(ConsultationQueueItem),
    /// The connection ended; no further updates will arrive
    Closed,
}

/// Handle for one open status subscription
#[derive(Debug)]
pub struct StatusStream {
    rx: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

impl StatusStream {
    /// Connect and start the reader task. Uses its own HTTP client so the
    /// per-request timeout of the REST client cannot cut the stream short.
    pub(crate) async fn connect(url: String, bearer: Option<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let mut request = client
            .get(&url)
            .header(header::ACCEPT, "text/event-stream");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: if message.trim().is_empty() {
                    format!("stream rejected with HTTP {}", status.as_u16())
                } else {
                    message
                },
                body: None,
            });
        }

        let connected = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let flag = Arc::clone(&connected);
        let task = tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("status stream broken: {}", e);
                        break;
                    }
                };
                for event in decoder.push(&bytes) {
                    if !UPDATE_EVENTS.contains(&event.event.as_str()) {
                        continue;
                    }
                    match serde_json::from_str::<ConsultationQueueItem>(&event.data) {
                        Ok(update) => {
                            if tx.send(StreamEvent::Update(update)).await.is_err() {
                                // Receiver gone; the subscription is over
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("ignoring malformed status event: {}", e);
                        }
                    }
                }
            }
            flag.store(false, Ordering::SeqCst);
            let _ = tx.send(StreamEvent::Closed).await;
        });

        Ok(Self {
            rx,
            task,
            connected,
        })
    }

    /// Whether the connection is still live
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Await the next event; `None` once closed and drained
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain without blocking
    pub fn try_recv(&mut self) -> Option<StreamEvent> {
        self.rx.try_recv().ok()
    }

    /// End the subscription. Late chunks become no-ops.
    pub fn close(&mut self) {
        self.task.abort();
        self.connected.store(false, Ordering::SeqCst);
        self.rx.close();
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.task.abort();
        self.connected.store(false, Ordering::SeqCst);
    }
}
