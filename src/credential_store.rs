use crate::{Result, SyncError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable storage for the long-lived refresh credential.
///
/// Only the refresh token is persisted; access tokens live in memory for
/// the duration of a run.
pub trait CredentialStore: Send + Sync {
    /// Load the stored refresh token, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored refresh token.
    fn save(&self, refresh_token: &str) -> Result<()>;

    /// Forget the stored refresh token.
    fn clear(&self) -> Result<()>;
}

/// Refresh token kept as a single-line file in the XDG data directory.
///
/// The token is opaque and stored verbatim. The default location is
/// `~/.local/share/tracklist-sync/refresh_token`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the XDG data directory.
    ///
    /// # Returns
    /// An error if the data directory cannot be determined.
    pub fn in_data_dir() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SyncError::Config("Cannot determine XDG data directory".to_string()))?;
        Ok(data_dir.join("tracklist-sync").join("refresh_token"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            log::debug!("No stored credential at {}", self.path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let token = contents.lines().next().unwrap_or("").trim();
        if token.is_empty() {
            log::debug!("Credential file {} is empty", self.path.display());
            return Ok(None);
        }

        log::debug!("Loaded refresh credential from {}", self.path.display());
        Ok(Some(token.to_string()))
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        let token = refresh_token.trim();
        if token.is_empty() || token.contains('\n') {
            return Err(SyncError::Config(
                "refresh credential must be a single non-empty line".to_string(),
            ));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{token}\n"))?;

        log::debug!("Refresh credential saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            log::info!("Removed stored credential {}", self.path.display());
        }
        Ok(())
    }
}

/// In-memory store, useful for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(refresh_token.into())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| SyncError::Config("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        *self.slot()? = Some(refresh_token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
