//! Token persistence for the single secure key-value slot holding the bearer token.
//!
//! `FileTokenStore` backs the CLI; `MemoryTokenStore` is for embedding and tests.
//! `Session` holds an `Arc<dyn TokenStore>` so either can be swapped in.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Key the token is stored under.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage for the persisted auth token. Each call is one atomic read or write.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> std::io::Result<Option<String>>;
    async fn save(&self, token: &str) -> std::io::Result<()>;
    async fn clear(&self) -> std::io::Result<()>;
}

// ────────────────────────────────────────────────────────────────────────────
// FileTokenStore
// ────────────────────────────────────────────────────────────────────────────

/// JSON key-value file (`{"authToken": "..."}`) readable only by its owner.
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing, empty or unparsable file holds no entries. A corrupt file is
    /// replaced by the next write.
    async fn read_entries(&self) -> std::io::Result<BTreeMap<String, String>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Ignoring unreadable token file {}: {e}", self.path.display());
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_entries(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_vec(entries)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");

        // a leftover temp file keeps its old mode, so start from scratch
        match tokio::fs::remove_file(&tmp).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> std::io::Result<Option<String>> {
        let mut entries = self.read_entries().await?;
        Ok(entries
            .remove(AUTH_TOKEN_KEY)
            .filter(|t| !t.is_empty()))
    }

    async fn save(&self, token: &str) -> std::io::Result<()> {
        let mut entries = self.read_entries().await?;
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries).await?;
        debug!("Token saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> std::io::Result<()> {
        let mut entries = self.read_entries().await?;
        entries.remove(AUTH_TOKEN_KEY);

        if entries.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        } else {
            self.write_entries(&entries).await?;
        }
        debug!("Token cleared from {}", self.path.display());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryTokenStore
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> std::io::Result<Option<String>> {
        Ok(self.slot.lock().map_err(poisoned)?.clone())
    }

    async fn save(&self, token: &str) -> std::io::Result<()> {
        *self.slot.lock().map_err(poisoned)? = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> std::io::Result<()> {
        *self.slot.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> std::io::Error {
    std::io::Error::new(ErrorKind::Other, "token store lock poisoned")
}
