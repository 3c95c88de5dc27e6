//! Persistence gateway.
//!
//! Storage is keyed by a document key (`"spring-quiz"`) and deals only in
//! [`SerializedDocument`] envelopes. The editor never talks to storage
//! directly; the session does it on the store's behalf.

use async_trait::async_trait;
use funnel_editor::{SerializeError, SerializedDocument};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Invalid document key: {0:?}")]
    InvalidKey(String),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] SerializeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document key: {0:?}")]
    InvalidKey(String),

    #[error("Stored document is invalid: {0}")]
    Serialize(#[from] SerializeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Async save/load of serialized documents
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save(&self, key: &str, document: &SerializedDocument) -> Result<(), PersistError>;

    async fn load(&self, key: &str) -> Result<SerializedDocument, LoadError>;
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is accepted
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// One `<key>.json` file per document under a data directory
#[derive(Debug, Clone)]
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn save(&self, key: &str, document: &SerializedDocument) -> Result<(), PersistError> {
        if !is_valid_key(key) {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        let json = document.to_json()?;

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        // One temp file per save so concurrent saves of a key never share one
        let tmp = self.root.join(format!(".{}.{}.json.tmp", key, Uuid::new_v4().simple()));

        // Readers only ever see a complete file
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(key, path = %path.display(), "Saved document");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<SerializedDocument, LoadError> {
        if !is_valid_key(key) {
            return Err(LoadError::InvalidKey(key.to_string()));
        }
        let path = self.path_for(key);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let document = SerializedDocument::from_json(&text)?;
        tracing::info!(key, path = %path.display(), "Loaded document");
        Ok(document)
    }
}

/// In-process storage with failure injection
#[derive(Debug, Default)]
pub struct MemoryGateway {
    entries: Mutex<HashMap<String, String>>,
    failing_saves: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail with [`PersistError::Unavailable`]
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Stored JSON text for a key
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Store text as-is, bypassing serialization
    pub fn insert_raw(&self, key: impl Into<String>, text: impl Into<String>) {
        self.lock().insert(key.into(), text.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn save(&self, key: &str, document: &SerializedDocument) -> Result<(), PersistError> {
        if !is_valid_key(key) {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(PersistError::Unavailable("injected failure".to_string()));
        }

        let json = document.to_json()?;
        self.lock().insert(key.to_string(), json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<SerializedDocument, LoadError> {
        if !is_valid_key(key) {
            return Err(LoadError::InvalidKey(key.to_string()));
        }
        let text = self
            .raw(key)
            .ok_or_else(|| LoadError::NotFound(key.to_string()))?;
        Ok(SerializedDocument::from_json(&text)?)
    }
}
