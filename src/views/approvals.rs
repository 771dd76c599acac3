//! Account approval screen (root administrator only)
//!
//! New registrations queue here as pending; a decision moves them to
//! approved or rejected and never deletes them.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth;
use crate::error::AppError;
use crate::models::Account;

pub struct ApprovalQueue {
    api: Arc<ApiClient>,
    pending: Vec<Account>,
}

impl ApprovalQueue {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            pending: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        auth::require_root(&self.api)?;
        self.pending = self.api.pending_accounts().await?;
        Ok(())
    }

    pub fn pending(&self) -> &[Account] {
        &self.pending
    }

    /// Approve or reject one registration, then re-fetch the queue
    pub async fn decide(&mut self, user_id: &str, approve: bool) -> Result<(), AppError> {
        auth::require_root(&self.api)?;
        self.api.decide_account(user_id, approve).await?;
        tracing::info!(
            user_id,
            decision = if approve { "approved" } else { "rejected" },
            "account decision submitted"
        );
        self.refresh().await
    }
}
