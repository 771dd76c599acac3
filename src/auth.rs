//! Login and registration flows
//!
//! The backend is the authority on credentials and account state; these
//! containers validate enough to block an obviously bad submit, then hand
//! the result to the session store.

use chrono::Utc;

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::{AccountStatus, LoginRequest, LoginResponse, RegisterRequest};
use crate::session::{SecureString, Session};
use crate::validation;

/// One field-level validation failure, kept local to the form
#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn from_validation(field: &'static str, error: validation::ValidationError) -> Self {
        Self {
            field,
            message: error.to_string(),
        }
    }

    /// Escalate when a submit is attempted anyway
    pub fn into_app_error(self) -> AppError {
        AppError::new(
            crate::error::ErrorCode::VALIDATION_INVALID_FORMAT,
            self.message,
            crate::error::ErrorCategory::Validation,
        )
    }
}

/// Where a login attempt leaves the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    SignedIn { admin_id: String, is_root: bool },
    /// Valid credentials, account still waiting for an approval decision
    ApprovalPending,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub user_id: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_non_empty(&self.user_id, "User ID") {
            errors.push(FieldError::from_validation("user_id", e));
        }
        if let Err(e) = validation::validate_non_empty(&self.password, "Password") {
            errors.push(FieldError::from_validation("password", e));
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub user_id: String,
    pub password: String,
    pub password_confirm: String,
    pub email: String,
    pub phone_number: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validation::validate_user_id(&self.user_id) {
            errors.push(FieldError::from_validation("user_id", e));
        }
        if let Err(e) = validation::validate_password_pair(&self.password, &self.password_confirm)
        {
            errors.push(FieldError::from_validation("password", e));
        }
        if let Err(e) = validation::validate_email(&self.email) {
            errors.push(FieldError::from_validation("email", e));
        }
        if let Err(e) = validation::validate_phone(&self.phone_number) {
            errors.push(FieldError::from_validation("phone_number", e));
        }
        errors
    }
}

fn first_error(mut errors: Vec<FieldError>) -> AppError {
    errors.remove(0).into_app_error()
}

/// Sign in and establish the session on success
pub async fn login(api: &ApiClient, form: &LoginForm) -> Result<LoginOutcome, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(first_error(errors));
    }

    let request = LoginRequest {
        user_id: form.user_id.trim().to_string(),
        password: form.password.clone(),
    };
    let response = api.login(&request).await?;

    let session = match response {
        LoginResponse::Tokens {
            access_token,
            refresh_token,
            is_root,
        } => Session {
            admin_id: request.user_id.clone(),
            access_token: SecureString::new(access_token),
            refresh_token: refresh_token.map(SecureString::new),
            is_root,
            signed_in_at: Utc::now(),
        },
        LoginResponse::Legacy { token, account } => match account.status {
            AccountStatus::PendingApproval => return Ok(LoginOutcome::ApprovalPending),
            AccountStatus::Rejected => {
                return Err(AppError::new(
                    crate::error::ErrorCode::AUTH_UNAUTHORIZED,
                    "This account registration was rejected",
                    crate::error::ErrorCategory::Auth,
                ));
            }
            AccountStatus::Approved => Session {
                admin_id: account.id,
                access_token: SecureString::new(token),
                refresh_token: None,
                is_root: account.is_root_admin,
                signed_in_at: Utc::now(),
            },
        },
    };

    let outcome = LoginOutcome::SignedIn {
        admin_id: session.admin_id.clone(),
        is_root: session.is_root,
    };
    api.session()
        .establish(session)
        .map_err(|e| AppError::internal(format!("failed to persist session: {}", e)))?;
    tracing::info!("signed in");
    Ok(outcome)
}

/// Submit a registration request; the account starts pending approval
pub async fn register(api: &ApiClient, form: &RegisterForm) -> Result<(), AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(first_error(errors));
    }

    let request = RegisterRequest {
        user_id: form.user_id.trim().to_string(),
        password: form.password.clone(),
        email: form.email.trim().to_string(),
        phone_number: form.phone_number.trim().to_string(),
    };
    api.register(&request).await?;
    Ok(())
}

/// Drop the session
pub fn logout(api: &ApiClient) {
    api.session().clear();
    tracing::info!("signed out");
}

/// Gate for root-only screens
pub fn require_root(api: &ApiClient) -> Result<(), AppError> {
    if !api.session().has_session() {
        return Err(AppError::no_session());
    }
    if !api.session().is_root() {
        return Err(AppError::root_required());
    }
    Ok(())
}
