//! Management backend client
//!
//! One `reqwest::Client` with a fixed per-request timeout, bearer auth read
//! from the injected session store, and a single typed decode boundary for
//! every endpoint the console talks to.

use std::sync::Arc;

use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{
    Account, AccountDecisionRequest, CallHistoryRow, CallLog, LoginRequest, LoginResponse,
    PageEnvelope, QuestionSet, RegisterRequest, StartCallRequest, VulnerableIndividual,
    VulnerableListResponse, VulnerableSummary,
};
use crate::queue::ConsultationQueueItem;
use crate::session::SessionStore;
use crate::stats::DashboardSummary;
use crate::stream::StatusStream;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request timeout")]
    Timeout,
    #[error("Unauthorized - session expired or invalid")]
    Unauthorized,
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

/// Query parameters of the paged history endpoint
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Zero-based server page
    pub page: u32,
    pub size: u32,
    pub sort: String,
    pub search_term: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            sort: "time,desc".to_string(),
            search_term: None,
        }
    }
}

impl HistoryQuery {
    fn query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("page", &self.page.to_string());
        query.append_pair("size", &self.size.to_string());
        query.append_pair("sort", &self.sort);
        if let Some(term) = self.search_term.as_deref().filter(|t| !t.trim().is_empty()) {
            query.append_pair("searchTerm", term);
        }
        query.finish()
    }
}

/// REST client for the management backend
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Build a client against the configured backend. The session store is
    /// injected here and is the only place tokens are read from.
    pub fn new(config: &AppConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: crate::config::normalize_base_url(&config.api_base_url),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Endpoints are rooted under `/api` unless the caller already says so
    fn url(&self, endpoint: &str) -> String {
        let ep = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };
        let path = if ep.starts_with("/api/") || ep == "/api" {
            ep
        } else {
            format!("/api{}", ep)
        };
        format!("{}{}", self.base_url, path)
    }

    fn map_transport(e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Request(e)
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let url = self.url(endpoint);
        tracing::debug!(%method, %url, "api request");

        let mut request = self.http.request(method, &url);
        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Self::map_transport)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(Self::map_transport)?;

        if !status.is_success() {
            let parsed: Option<serde_json::Value> = serde_json::from_str(&text).ok();
            let message = parsed
                .as_ref()
                .and_then(|b| {
                    b.get("message")
                        .or_else(|| b.get("error"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .or_else(|| {
                    let trimmed = text.trim();
                    (!is_json && !trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .unwrap_or_else(|| {
                    format!(
                        "{} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    )
                });
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                body: parsed,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("invalid JSON from {}: {}", url, e)))?;
        Ok(Some(value))
    }

    fn decode<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Result<T, ApiError> {
        let value = value.ok_or_else(|| ApiError::Decode("empty response body".to_string()))?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let value = self.send::<()>(Method::GET, endpoint, None).await?;
        Self::decode(value)
    }

    async fn post_empty<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<(), ApiError> {
        self.send(Method::POST, endpoint, Some(body)).await?;
        Ok(())
    }

    async fn put_empty<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<(), ApiError> {
        self.send(Method::PUT, endpoint, Some(body)).await?;
        Ok(())
    }

    async fn delete_empty(&self, endpoint: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, endpoint, None).await?;
        Ok(())
    }

    // =========================================================================
    // Auth & accounts
    // =========================================================================

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let value = self.send(Method::POST, "/auth/login", Some(request)).await?;
        Self::decode(value)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.post_empty("/account/register", request).await
    }

    pub async fn pending_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.get("/account/pending").await
    }

    pub async fn decide_account(&self, user_id: &str, approve: bool) -> Result<(), ApiError> {
        let body = AccountDecisionRequest {
            user_id: user_id.to_string(),
            approve,
        };
        self.post_empty("/account/approve", &body).await
    }

    // =========================================================================
    // Vulnerable individuals
    // =========================================================================

    pub async fn vulnerable_list(&self) -> Result<Vec<VulnerableSummary>, ApiError> {
        let response: VulnerableListResponse = self.get("/vulnerable/list").await?;
        Ok(response.into_rows())
    }

    pub async fn vulnerable(&self, user_id: &str) -> Result<VulnerableIndividual, ApiError> {
        self.get(&format!("/vulnerable/{}", user_id)).await
    }

    pub async fn create_vulnerable(
        &self,
        record: &VulnerableIndividual,
    ) -> Result<(), ApiError> {
        self.post_empty("/vulnerable/add", record).await
    }

    pub async fn update_vulnerable(
        &self,
        user_id: &str,
        record: &VulnerableIndividual,
    ) -> Result<(), ApiError> {
        self.put_empty(&format!("/vulnerable/{}", user_id), record).await
    }

    pub async fn delete_vulnerable(&self, user_id: &str) -> Result<(), ApiError> {
        self.delete_empty(&format!("/vulnerable/{}", user_id)).await
    }

    // =========================================================================
    // Question sets
    // =========================================================================

    pub async fn question_list(&self) -> Result<Vec<QuestionSet>, ApiError> {
        self.get("/question/list").await
    }

    pub async fn question_set(&self, id: &str) -> Result<QuestionSet, ApiError> {
        self.get(&format!("/question/{}", id)).await
    }

    pub async fn create_question_set(&self, set: &QuestionSet) -> Result<(), ApiError> {
        self.post_empty("/question/add", set).await
    }

    pub async fn update_question_set(&self, id: &str, set: &QuestionSet) -> Result<(), ApiError> {
        self.put_empty(&format!("/question/{}", id), set).await
    }

    pub async fn delete_question_set(&self, id: &str) -> Result<(), ApiError> {
        self.delete_empty(&format!("/question/{}", id)).await
    }

    // =========================================================================
    // Calls
    // =========================================================================

    pub async fn start_call(&self, request: &StartCallRequest) -> Result<(), ApiError> {
        self.post_empty("/call/start", request).await
    }

    pub async fn call_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<PageEnvelope<CallHistoryRow>, ApiError> {
        self.get(&format!("/call/history?{}", query.query_string()))
            .await
    }

    pub async fn call_log(&self, id: &str) -> Result<CallLog, ApiError> {
        self.get(&format!("/call/history/{}", id)).await
    }

    /// Snapshot of currently active queue items
    pub async fn active_calls(&self) -> Result<Vec<ConsultationQueueItem>, ApiError> {
        self.get("/call/active").await
    }

    /// Open the live status stream for this admin. The returned handle owns
    /// the connection; dropping or closing it ends the subscription.
    pub async fn open_status_stream(&self, admin_id: &str) -> Result<StatusStream, ApiError> {
        let url = self.url(&format!("/call/sse/{}", admin_id));
        StatusStream::connect(url, self.session.bearer_token()).await
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get("/dashboard/summary").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = AppConfig {
            api_base_url: base.to_string(),
            ..AppConfig::default()
        };
        ApiClient::new(&config, Arc::new(SessionStore::ephemeral())).unwrap()
    }

    #[test]
    fn test_url_prefixes_api() {
        let c = client("http://localhost:8080");
        assert_eq!(c.url("/vulnerable/list"), "http://localhost:8080/api/vulnerable/list");
        assert_eq!(c.url("vulnerable/list"), "http://localhost:8080/api/vulnerable/list");
    }

    #[test]
    fn test_url_keeps_existing_api_prefix() {
        let c = client("http://localhost:8080");
        assert_eq!(c.url("/api/question/list"), "http://localhost:8080/api/question/list");
        assert_eq!(c.url("/api"), "http://localhost:8080/api");
    }

    #[test]
    fn test_url_with_trailing_slash_base() {
        let c = client("http://localhost:8080///");
        assert_eq!(c.url("/auth/login"), "http://localhost:8080/api/auth/login");
    }

    #[test]
    fn test_history_query_string() {
        let query = HistoryQuery {
            page: 0,
            size: 1000,
            sort: "time,desc".to_string(),
            search_term: None,
        };
        assert_eq!(query.query_string(), "page=0&size=1000&sort=time%2Cdesc");

        let query = HistoryQuery {
            search_term: Some("김 영희".to_string()),
            ..HistoryQuery::default()
        };
        assert!(query.query_string().contains("searchTerm="));

        let query = HistoryQuery {
            search_term: Some("  ".to_string()),
            ..HistoryQuery::default()
        };
        assert!(!query.query_string().contains("searchTerm"));
    }
}
