//! Session ownership
//!
//! The session store is the single owner of the bearer token lifecycle:
//! established on login, read by the API client, cleared on logout or
//! invalidation. Nothing else touches the persisted session file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const SESSION_FILE: &str = "session.json";

/// String wrapper that is zeroed on drop and never printed in debug output
pub struct SecureString {
    value: String,
}

impl SecureString {
    /// Create a new SecureString from a String (takes ownership)
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Get reference to the inner string
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Clone for SecureString {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the actual value in debug output
        f.debug_struct("SecureString").finish_non_exhaustive()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// An established admin session
#[derive(Debug, Clone)]
pub struct Session {
    pub admin_id: String,
    pub access_token: SecureString,
    pub refresh_token: Option<SecureString>,
    pub is_root: bool,
    pub signed_in_at: DateTime<Utc>,
}

/// On-disk session format
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    admin_id: String,
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default)]
    is_root: bool,
    signed_in_at: DateTime<Utc>,
}

impl SessionFile {
    fn into_session(self) -> Session {
        Session {
            admin_id: self.admin_id,
            access_token: SecureString::new(self.access_token),
            refresh_token: self.refresh_token.map(SecureString::new),
            is_root: self.is_root,
            signed_in_at: self.signed_in_at,
        }
    }

    fn from_session(session: &Session) -> Self {
        Self {
            admin_id: session.admin_id.clone(),
            access_token: session.access_token.as_str().to_string(),
            refresh_token: session.refresh_token.as_ref().map(|t| t.as_str().to_string()),
            is_root: session.is_root,
            signed_in_at: session.signed_in_at,
        }
    }
}

/// Single owner of session state, backed by a private JSON file
pub struct SessionStore {
    path: PathBuf,
    inner: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Open the store, loading a persisted session when one exists.
    /// A corrupt session file is discarded, not fatal.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(SESSION_FILE);
        let session = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<SessionFile>(&raw) {
                Ok(file) => Some(file.into_session()),
                Err(e) => {
                    tracing::warn!("discarding unreadable session file: {}", e);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            inner: RwLock::new(session),
        }
    }

    /// In-memory store for tests
    pub fn ephemeral() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("callbot-session-{}.json", uuid::Uuid::new_v4())),
            inner: RwLock::new(None),
        }
    }

    /// Establish a new session, replacing any previous one
    pub fn establish(&self, session: Session) -> std::io::Result<()> {
        self.persist(&session)?;
        *self.inner.write() = Some(session);
        Ok(())
    }

    /// Drop the session and remove the persisted file
    pub fn clear(&self) {
        *self.inner.write() = None;
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("failed to remove session file: {}", e);
            }
        }
    }

    pub fn has_session(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Current bearer token, if signed in
    pub fn bearer_token(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .map(|s| s.access_token.as_str().to_string())
    }

    pub fn admin_id(&self) -> Option<String> {
        self.inner.read().as_ref().map(|s| s.admin_id.clone())
    }

    pub fn is_root(&self) -> bool {
        self.inner.read().as_ref().map(|s| s.is_root).unwrap_or(false)
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    fn persist(&self, session: &Session) -> std::io::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| std::io::Error::other("session path has no parent"))?;
        fs::create_dir_all(parent)?;

        let contents = serde_json::to_vec_pretty(&SessionFile::from_session(session))
            .map_err(std::io::Error::other)?;

        // Write-then-rename so a crash never leaves a half-written session
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&contents)?;
        temp.as_file().sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
