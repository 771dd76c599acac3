//! callbot-admin - admin console for the vulnerable-population outreach
//! call-bot. All call orchestration and transcript analysis lives in the
//! management backend; this crate is the operator-facing client.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod queue;
pub mod routes;
pub mod session;
pub mod stats;
pub mod stream;
pub mod taxonomy;
pub mod validation;
pub mod views;

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::session::SessionStore;

/// Application state shared by every screen
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<SessionStore>,
    pub api: Arc<ApiClient>,
}

impl AppState {
    /// Wire up config, session store, and API client
    pub fn initialize(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(|e| {
            AppError::new(
                crate::error::ErrorCode::INTERNAL_ERROR,
                "Invalid configuration",
                crate::error::ErrorCategory::Internal,
            )
            .with_detail(e)
        })?;

        let session = Arc::new(SessionStore::open(&config.data_dir));
        let api = Arc::new(
            ApiClient::new(&config, Arc::clone(&session))
                .map_err(AppError::from)?,
        );

        Ok(Self {
            config,
            session,
            api,
        })
    }
}
