//! Local session state: where the remote store lives, who we are, and which
//! folder is selected.
//!
//! Stored as a small YAML file next to nothing else. It is never synced
//! anywhere and concurrent invocations are not coordinated.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::encoding;
use crate::error::{Error, Result};
use crate::models::Id;

/// Persisted session fields. Absent keys stay absent on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Id of the selected folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<Id>,
}

impl SessionData {
    /// Overlay every field that is set in `update`.
    pub fn merge(&mut self, update: SessionUpdate) {
        let SessionUpdate(update) = update;
        if update.url.is_some() {
            self.url = update.url;
        }
        if update.username.is_some() {
            self.username = update.username;
        }
        if update.token.is_some() {
            self.token = update.token;
        }
        if update.folder.is_some() {
            self.folder = update.folder;
        }
    }
}

/// Partial session values to be merged into what is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate(SessionData);

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an update from a login token.
    ///
    /// `encoded` is base64 of `<username>;<token>` (a `:` separator is
    /// accepted as well); the split happens at the first separator.
    pub fn from_encoded_token(encoded: &str, url: impl Into<String>) -> Result<Self> {
        let decoded = encoding::decode_wrapped(encoded).ok_or(Error::InvalidToken)?;
        let (username, token) = decoded
            .split_once(&[';', ':'][..])
            .filter(|(user, token)| !user.is_empty() && !token.is_empty())
            .ok_or(Error::InvalidToken)?;

        Ok(Self::new()
            .with_url(url)
            .with_username(username)
            .with_token(token))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.0.url = Some(url.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.0.username = Some(username.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.0.token = Some(token.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<Id>) -> Self {
        self.0.folder = Some(folder.into());
        self
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.ccli/session`, or `None` when there is no home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ccli").join("session"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> Error {
        Error::Session {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Stored session, or `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        if content.trim().is_empty() {
            return Ok(Some(SessionData::default()));
        }

        let session = serde_yaml::from_str(&content).map_err(|e| self.error(e))?;
        Ok(Some(session))
    }

    /// Stored session, failing with `SessionMissing` when there is none.
    pub fn require(&self) -> Result<SessionData> {
        self.load()?.ok_or(Error::SessionMissing)
    }

    /// Merge `update` into the stored session and write it back.
    pub fn save(&self, update: SessionUpdate) -> Result<SessionData> {
        let mut session = self.load()?.unwrap_or_default();
        session.merge(update);

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.error(e))?;
        }
        let content = serde_yaml::to_string(&session).map_err(|e| self.error(e))?;
        std::fs::write(&self.path, content).map_err(|e| self.error(e))?;

        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(session)
    }

    /// Forget the session.
    ///
    /// Removes the file and its directory when nothing else is left in it.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| self.error(e))?;
        }
        if let Some(dir) = self.path.parent() {
            let is_empty = std::fs::read_dir(dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if is_empty {
                std::fs::remove_dir(dir).map_err(|e| self.error(e))?;
            }
        }
        Ok(())
    }

    pub fn is_folder_selected(&self) -> Result<bool> {
        Ok(self.load()?.is_some_and(|s| s.folder.is_some()))
    }

    /// Selected folder id, failing with `FolderNotSelected` when unset.
    pub fn require_folder(&self) -> Result<Id> {
        self.load()?
            .and_then(|s| s.folder)
            .ok_or(Error::FolderNotSelected)
    }
}
