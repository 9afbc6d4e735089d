//! Persisted string entries that survive across console runs

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::ConsoleError;
use crate::filesys::file::File;

/// Key holding the bearer credential
pub const TOKEN_KEY: &str = "dockrune_token";

/// Key holding the display username
pub const USER_KEY: &str = "dockrune_user";

/// String key/value storage
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ConsoleError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ConsoleError>;

    async fn remove_item(&self, key: &str) -> Result<(), ConsoleError>;
}

/// Entries kept in a single owner-only JSON file
pub struct FileStorage {
    file: File,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(file: File) -> Self {
        Self {
            file,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, ConsoleError> {
        match self.file.read_json_opt().await {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(ConsoleError::JsonError(e)) => Err(ConsoleError::StorageError(format!(
                "{} is corrupt: {}",
                self.file.path().display(),
                e
            ))),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), ConsoleError> {
        if entries.is_empty() {
            return self.file.delete().await;
        }
        self.file.write_json(entries).await?;
        self.file.set_permissions_600().await
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ConsoleError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ConsoleError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        debug!("Persisting entry {}", key);
        self.save(&entries).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), ConsoleError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            debug!("Removing entry {}", key);
            self.save(&entries).await?;
        }
        Ok(())
    }
}

/// Process-local storage, used when nothing should touch the disk
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ConsoleError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ConsoleError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ConsoleError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
