//! Persisted client session: access token, refresh token, cached identity.
//!
//! Everything that reads or writes the session goes through [`SessionStore`]
//! so the bootstrapper and action handlers can run against an in-memory fake.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use shared::User;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl PersistedSession {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<PersistedSession, StorageError>;
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;
    /// Drop every persisted value at once
    fn clear(&self) -> Result<(), StorageError>;

    fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.token)
    }

    fn cached_user(&self) -> Result<Option<User>, StorageError> {
        Ok(self.load()?.user)
    }

    fn update(&self, apply: &mut dyn FnMut(&mut PersistedSession)) -> Result<(), StorageError> {
        let mut session = self.load()?;
        apply(&mut session);
        self.save(&session)
    }
}

/// JSON file in the platform data directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn default_location() -> Result<Self, StorageError> {
        let dirs = crate::config::project_dirs().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<PersistedSession, StorageError> {
        if !self.path.exists() {
            return Ok(PersistedSession::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved session to {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, used by tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<PersistedSession>,
}

impl MemorySessionStore {
    pub fn new(session: PersistedSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    pub fn snapshot(&self) -> PersistedSession {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<PersistedSession, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.save(&PersistedSession::default())
    }
}
