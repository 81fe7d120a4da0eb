//! Persisted local state: the OAuth token and the AI endpoint config.
//!
//! Both are stored as opaque JSON blobs. [`FileStorage`] keeps them under
//! the XDG data directory (`~/.local/share/quizlist/` by default);
//! [`MemoryStorage`] backs tests and ephemeral sessions.

use crate::config::AiConfig;
use crate::session::AuthToken;
use crate::{QuizlistError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const TOKEN_FILE: &str = "token.json";
const AI_CONFIG_FILE: &str = "ai_config.json";

/// Storage backend for the token and AI config blobs.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the persisted token, or `None` when nothing is stored.
    async fn load_token(&self) -> Result<Option<AuthToken>>;

    /// Persist the token, replacing any stored copy.
    async fn save_token(&mut self, token: &AuthToken) -> Result<()>;

    /// Remove any persisted token. A no-op when nothing is stored.
    async fn clear_token(&mut self) -> Result<()>;

    /// Load the persisted AI endpoint config, or `None` when absent.
    async fn load_ai_config(&self) -> Result<Option<AiConfig>>;

    /// Persist the AI endpoint config, replacing any stored copy.
    async fn save_ai_config(&mut self, config: &AiConfig) -> Result<()>;

    /// Clear all stored state.
    async fn clear_all(&mut self) -> Result<()>;
}

/// File-based storage rooted at a directory of JSON blobs.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Storage rooted at the XDG data directory.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            QuizlistError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "cannot determine XDG data directory",
            ))
        })?;
        Ok(Self::with_root(data_dir.join("quizlist")))
    }

    /// Storage rooted at an explicit directory, used by tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_blob<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        let blob = serde_json::from_str(&json)
            .map_err(|e| QuizlistError::Parse(format!("stored blob {name}: {e}")))?;
        Ok(Some(blob))
    }

    fn write_blob<T: Serialize>(&self, name: &str, blob: &T) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        let json = serde_json::to_string_pretty(blob)
            .map_err(|e| QuizlistError::Parse(format!("serializing blob {name}: {e}")))?;
        fs::write(&path, json)?;
        log::debug!("state saved to {}", path.display());
        Ok(())
    }

    fn remove_blob(&self, name: &str) -> Result<()> {
        let path = self.root.join(name);
        if path.exists() {
            fs::remove_file(&path)?;
            log::debug!("state removed from {}", path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn load_token(&self) -> Result<Option<AuthToken>> {
        self.read_blob(TOKEN_FILE)
    }

    async fn save_token(&mut self, token: &AuthToken) -> Result<()> {
        self.write_blob(TOKEN_FILE, token)
    }

    async fn clear_token(&mut self) -> Result<()> {
        self.remove_blob(TOKEN_FILE)
    }

    async fn load_ai_config(&self) -> Result<Option<AiConfig>> {
        self.read_blob(AI_CONFIG_FILE)
    }

    async fn save_ai_config(&mut self, config: &AiConfig) -> Result<()> {
        self.write_blob(AI_CONFIG_FILE, config)
    }

    async fn clear_all(&mut self) -> Result<()> {
        self.remove_blob(TOKEN_FILE)?;
        self.remove_blob(AI_CONFIG_FILE)
    }
}

/// In-memory storage for tests and sessions that should not persist.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    token: RwLock<Option<AuthToken>>,
    ai_config: RwLock<Option<AiConfig>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load_token(&self) -> Result<Option<AuthToken>> {
        Ok(self.token.read().await.clone())
    }

    async fn save_token(&mut self, token: &AuthToken) -> Result<()> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear_token(&mut self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }

    async fn load_ai_config(&self) -> Result<Option<AiConfig>> {
        Ok(self.ai_config.read().await.clone())
    }

    async fn save_ai_config(&mut self, config: &AiConfig) -> Result<()> {
        *self.ai_config.write().await = Some(config.clone());
        Ok(())
    }

    async fn clear_all(&mut self) -> Result<()> {
        *self.token.write().await = None;
        *self.ai_config.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_storage_token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::with_root(dir.path().join("quizlist"));

        assert!(storage.load_token().await.unwrap().is_none());

        let token = AuthToken {
            access_token: "ya29.test".to_string(),
            expires_at_epoch_ms: 1_700_000_000_000,
        };
        storage.save_token(&token).await.unwrap();
        assert_eq!(storage.load_token().await.unwrap(), Some(token));

        storage.clear_token().await.unwrap();
        assert!(storage.load_token().await.unwrap().is_none());
        // Clearing twice is fine.
        storage.clear_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_ai_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::with_root(dir.path());

        let config = AiConfig::new("sk-test", "https://api.example.com/v1", "gpt-4o-mini");
        storage.save_ai_config(&config).await.unwrap();
        assert_eq!(storage.load_ai_config().await.unwrap(), Some(config));

        storage.clear_all().await.unwrap();
        assert!(storage.load_ai_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_storage_rejects_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").unwrap();
        let storage = FileStorage::with_root(dir.path());
        assert!(matches!(
            storage.load_token().await,
            Err(QuizlistError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        let token = AuthToken {
            access_token: "tok".to_string(),
            expires_at_epoch_ms: 42,
        };
        storage.save_token(&token).await.unwrap();
        assert_eq!(storage.load_token().await.unwrap(), Some(token));
        storage.clear_all().await.unwrap();
        assert!(storage.load_token().await.unwrap().is_none());
    }
}
