//! Session credential storage.
//!
//! A single slot holding the bearer token, optionally mirrored to a file so the
//! session survives restarts. Cloning a store shares the slot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Result;

#[derive(Clone, Debug)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            path: None,
        }
    }

    /// Opens a file-backed store, loading any token persisted earlier.
    ///
    /// A missing or blank file yields an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), present = token.is_some(), "Opened credential store");

        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            path: Some(path),
        })
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replaces the stored token. The slot only changes once the file write
    /// succeeded.
    pub async fn set(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        let mut guard = self.token.write().await;

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            write_private(path, &token).await?;
        }

        *guard = Some(token);
        info!("Stored session credential");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.token.write().await;

        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if guard.take().is_some() {
            info!("Cleared session credential");
        }
        Ok(())
    }
}

/// Writes `token` to `path`. On unix a new file is created owner-only.
async fn write_private(path: &Path, token: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(token.as_bytes()).await?;
    file.flush().await
}
