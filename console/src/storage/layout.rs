//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Storage layout for the console
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Persisted key/value entries (credential and username)
    pub fn local_storage_file(&self) -> File {
        File::new(self.base_dir.join("local_storage.json"))
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Default directory for rolling log files
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let base_dir = home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dockrune");

        Self::new(base_dir)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
