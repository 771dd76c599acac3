//! API client behavior against a live loopback server: URL rooting, bearer
//! attach, error normalization, timeout

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use callbot_admin_lib::api::{ApiClient, ApiError};
use callbot_admin_lib::config::AppConfig;
use callbot_admin_lib::error::AppError;
use callbot_admin_lib::session::{SecureString, Session, SessionStore};

use common::{Reply, TestServer};

fn config_for(server: &TestServer) -> AppConfig {
    AppConfig {
        api_base_url: server.base_url.clone(),
        request_timeout_secs: 2,
        ..AppConfig::default()
    }
}

fn client(server: &TestServer) -> ApiClient {
    ApiClient::new(&config_for(server), Arc::new(SessionStore::ephemeral())).unwrap()
}

fn signed_in_client(server: &TestServer, token: &str) -> ApiClient {
    let store = Arc::new(SessionStore::ephemeral());
    store
        .establish(Session {
            admin_id: "admin123".to_string(),
            access_token: SecureString::new(token.to_string()),
            refresh_token: None,
            is_root: false,
            signed_in_at: Utc::now(),
        })
        .unwrap();
    ApiClient::new(&config_for(server), store).unwrap()
}

#[tokio::test]
async fn requests_are_rooted_under_api() {
    let server = TestServer::spawn(|req| match req.url.as_str() {
        "/api/vulnerable/list" => Reply::json(200, "[]"),
        other => Reply::json(500, format!("{{\"message\":\"bad url {}\"}}", other)),
    });

    let rows = client(&server).vulnerable_list().await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(server.count("GET", "/api/vulnerable/list"), 1);
}

#[tokio::test]
async fn bearer_token_is_attached_when_signed_in() {
    let server = TestServer::spawn(|_| Reply::json(200, "[]"));
    let api = signed_in_client(&server, "tok-xyz");
    api.vulnerable_list().await.unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer tok-xyz")
    );
}

#[tokio::test]
async fn no_bearer_header_without_session() {
    let server = TestServer::spawn(|_| Reply::json(200, "[]"));
    client(&server).vulnerable_list().await.unwrap();
    assert_eq!(server.requests()[0].authorization, None);
}

#[tokio::test]
async fn error_message_extracted_from_body() {
    let server = TestServer::spawn(|_| {
        Reply::json(409, "{\"message\":\"duplicate user id\"}")
    });

    let err = client(&server).vulnerable("v-1").await.unwrap_err();
    match err {
        ApiError::Api { status, message, .. } => {
            assert_eq!(status, 409);
            assert_eq!(message, "duplicate user id");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn error_falls_back_to_status_text() {
    let server = TestServer::spawn(|_| Reply::json(500, "{}"));
    let err = client(&server).vulnerable("v-1").await.unwrap_err();
    match err {
        ApiError::Api { status, message, .. } => {
            assert_eq!(status, 500);
            assert!(message.contains("500"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_is_distinguished() {
    let server = TestServer::spawn(|_| Reply::json(401, "{\"message\":\"expired\"}"));
    let err = client(&server).vulnerable_list().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    // And routes to login at the AppError level
    let app: AppError = err.into();
    assert!(app.requires_login());
}

#[tokio::test]
async fn no_content_is_success() {
    let server = TestServer::spawn(|_| Reply::no_content());
    client(&server).delete_vulnerable("v-1").await.unwrap();
    assert_eq!(server.count("DELETE", "/api/vulnerable/v-1"), 1);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = TestServer::spawn(|_| Reply {
        delay: Some(Duration::from_secs(5)),
        ..Reply::json(200, "[]")
    });

    let err = client(&server).vulnerable_list().await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout));

    let app: AppError = err.into();
    assert_eq!(app.code, "NETWORK_TIMEOUT");
    assert!(app.retryable);
}

#[tokio::test]
async fn malformed_success_body_fails_loudly() {
    let server = TestServer::spawn(|_| Reply::json(200, "{\"unexpected\": true}"));
    let err = client(&server).vulnerable_list().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn request_body_uses_backend_field_names() {
    let server = TestServer::spawn(|_| Reply::no_content());
    let api = client(&server);
    api.decide_account("newadmin1", true).await.unwrap();

    let body: serde_json::Value =
        serde_json::from_str(&server.requests()[0].body).unwrap();
    assert_eq!(body["userId"], "newadmin1");
    assert_eq!(body["approve"], true);
}

#[tokio::test]
async fn history_query_lands_on_query_string() {
    let server = TestServer::spawn(|req| {
        if req.url.starts_with("/api/call/history?") {
            Reply::json(200, "{\"content\":[],\"totalPages\":0,\"totalElements\":0}")
        } else {
            Reply::json(404, "{}")
        }
    });

    let api = client(&server);
    let query = callbot_admin_lib::api::HistoryQuery {
        page: 2,
        size: 50,
        sort: "time,desc".to_string(),
        search_term: Some("김영희".to_string()),
    };
    let page = api.call_history(&query).await.unwrap();
    assert_eq!(page.total_elements, 0);

    let url = server.requests()[0].url.clone();
    assert!(url.contains("page=2"));
    assert!(url.contains("size=50"));
    assert!(url.contains("searchTerm="));
}
