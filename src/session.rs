//! Session/token persistence.
//!
//! Holds the bearer token and the cached profile of the signed-in user.
//! There is no expiry and no refresh: whatever is stored is used as-is.

use crate::types::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Profile of the signed-in user as cached next to the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Fields the backend sends that this crate does not interpret
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CachedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            role: None,
            extra: HashMap::new(),
        }
    }
}

/// Key/value storage for the auth token and cached user.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn user(&self) -> Option<CachedUser>;

    fn save(&self, token: &str, user: Option<CachedUser>) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// On-disk layout shared by the stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<CachedUser>,
}

/// Process-local session store. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    record: Arc<RwLock<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .record
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = Some(token.into());
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn user(&self) -> Option<CachedUser> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    fn save(&self, token: &str, user: Option<CachedUser>) -> Result<()> {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        record.token = Some(token.to_string());
        record.user = user;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = SessionRecord::default();
        Ok(())
    }
}

/// JSON file backed session store.
///
/// The file is read on every access so that another process signing in or
/// out is picked up on the next `connect`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionRecord> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                RealtimeError::Session(format!(
                    "corrupt session file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_or_default(&self) -> SessionRecord {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable session: {}", e);
            SessionRecord::default()
        })
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        self.load_or_default().token
    }

    fn user(&self) -> Option<CachedUser> {
        self.load_or_default().user
    }

    fn save(&self, token: &str, user: Option<CachedUser>) -> Result<()> {
        let record = SessionRecord {
            token: Some(token.to_string()),
            user,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&record)?)?;
        tracing::debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
