//! Token persistence.

use crate::tokens::TokenSet;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Storage key of the token set persisted for `provider_id`.
pub fn token_key(provider_id: &str) -> String {
    format!("{provider_id}.tokens")
}

/// Key-value persistence for token sets.
///
/// A missing key means "no prior session" and is not an error. Concurrent
/// writers to the same key are last-writer-wins.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<TokenSet>, StoreError>;

    async fn set(&self, key: &str, tokens: &TokenSet) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory implementation of TokenStore
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, TokenSet>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<TokenSet>, StoreError> {
        Ok(self.tokens.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, tokens: &TokenSet) -> Result<(), StoreError> {
        self.tokens
            .write()
            .await
            .insert(key.to_string(), tokens.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.tokens.write().await.remove(key);
        Ok(())
    }
}

/// Token store backed by a single JSON document of `key -> TokenSet`.
///
/// Writes go to a sibling temporary file that is renamed over the original.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.tmp`, unique per store file.
    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn load(&self) -> Result<BTreeMap<String, TokenSet>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, TokenSet>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<TokenSet>, StoreError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, tokens: &TokenSet) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), tokens.clone());
        self.save(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn sample_tokens() -> TokenSet {
        TokenSet {
            access_token: Some("AT1".to_string()),
            refresh_token: Some("RT1".to_string()),
            access_token_expires_in: Some(3600),
            access_token_expires_at: DateTime::from_timestamp(4600, 0),
        }
    }

    #[test]
    fn test_token_key_is_provider_scoped() {
        assert_eq!(token_key("google"), "google.tokens");
        assert_ne!(token_key("google"), token_key("facebook"));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryTokenStore::new();

        assert_eq!(store.get("google.tokens").await.unwrap(), None);

        store.set("google.tokens", &sample_tokens()).await.unwrap();
        assert_eq!(
            store.get("google.tokens").await.unwrap(),
            Some(sample_tokens())
        );
        assert_eq!(store.get("facebook.tokens").await.unwrap(), None);

        store.delete("google.tokens").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = FileTokenStore::new(&path);

        assert_eq!(store.get("google.tokens").await.unwrap(), None);

        store.set("google.tokens", &sample_tokens()).await.unwrap();
        store
            .set("facebook.tokens", &TokenSet::default())
            .await
            .unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(
            reopened.get("google.tokens").await.unwrap(),
            Some(sample_tokens())
        );

        reopened.delete("google.tokens").await.unwrap();
        assert_eq!(store.get("google.tokens").await.unwrap(), None);
        assert_eq!(
            store.get("facebook.tokens").await.unwrap(),
            Some(TokenSet::default())
        );
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_file_stores_sharing_a_stem_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let json_store = FileTokenStore::new(dir.path().join("tokens.json"));
        let yaml_store = FileTokenStore::new(dir.path().join("tokens.yaml"));

        assert_ne!(json_store.tmp_path(), yaml_store.tmp_path());
        assert_eq!(json_store.tmp_path(), dir.path().join("tokens.json.tmp"));

        json_store
            .set("google.tokens", &sample_tokens())
            .await
            .unwrap();
        yaml_store
            .set("facebook.tokens", &sample_tokens())
            .await
            .unwrap();

        assert_eq!(json_store.get("facebook.tokens").await.unwrap(), None);
        assert_eq!(yaml_store.get("google.tokens").await.unwrap(), None);
        assert_eq!(
            yaml_store.get("facebook.tokens").await.unwrap(),
            Some(sample_tokens())
        );
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(
            store.get("google.tokens").await,
            Err(StoreError::Serialization(_))
        ));
    }
}
