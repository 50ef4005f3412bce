use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::error_handling::types::StorageError;
use crate::storage::token_store::TokenStore;

pub const DEFAULT_SLOT: &str = "token";

/// Filesystem-backed token slot: one plain-text file named after the slot.
pub struct FileTokenStore {
    slot_path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(base_path: P, slot: &str) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        if slot.is_empty() || slot.contains(['/', '\\']) {
            error!("Invalid token slot name {:?}", slot);
            return Err(StorageError::WriteFailed);
        }
        fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create token dir {}: {}", base_path.display(), e);
            StorageError::WriteFailed
        })?;
        let slot_path = base_path.join(slot);
        info!("FileTokenStore initialized at {}", slot_path.display());
        Ok(Self { slot_path })
    }

    /// Construct FileTokenStore using env var MARATHON_TOKEN_DIR if set, otherwise current directory.
    pub fn new_default() -> Result<Self, StorageError> {
        if let Ok(dir) = std::env::var("MARATHON_TOKEN_DIR") {
            info!("Using FileTokenStore from MARATHON_TOKEN_DIR: {}", dir);
            return Self::new(PathBuf::from(dir), DEFAULT_SLOT);
        }
        let cwd = std::env::current_dir().map_err(|e| {
            error!("Failed to get current dir: {}", e);
            StorageError::ReadFailed
        })?;
        Self::new(cwd, DEFAULT_SLOT)
    }

    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        let mut content = String::new();
        match File::open(&self.slot_path) {
            Ok(mut f) => f.read_to_string(&mut content).map_err(|e| {
                error!("Failed to read token slot {}: {}", self.slot_path.display(), e);
                StorageError::ReadFailed
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!("Failed to open token slot {}: {}", self.slot_path.display(), e);
                return Err(StorageError::ReadFailed);
            }
        };
        let token = content.trim();
        if token.is_empty() {
            return Ok(None);
        }
        debug!("Loaded session token from {}", self.slot_path.display());
        Ok(Some(token.to_string()))
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        let mut f = File::create(&self.slot_path).map_err(|e| {
            error!("Failed to create token slot {}: {}", self.slot_path.display(), e);
            StorageError::WriteFailed
        })?;
        f.write_all(token.as_bytes()).map_err(|e| {
            error!("Failed to write token slot {}: {}", self.slot_path.display(), e);
            StorageError::WriteFailed
        })?;
        debug!("Saved session token to {}", self.slot_path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.slot_path) {
            Ok(()) => {
                debug!("Cleared token slot {}", self.slot_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to clear token slot {}: {}", self.slot_path.display(), e);
                Err(StorageError::WriteFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path(), DEFAULT_SLOT).unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save("abc123").unwrap();
        assert_eq!(store.load().unwrap(), Some("abc123".to_string()));
        assert_eq!(fs::read_to_string(store.slot_path()).unwrap(), "abc123");

        store.save("def456").unwrap();
        assert_eq!(store.load().unwrap(), Some("def456".to_string()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_token_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        FileTokenStore::new(dir.path(), "session").unwrap().save("persisted").unwrap();
        let reopened = FileTokenStore::new(dir.path(), "session").unwrap();
        assert_eq!(reopened.load().unwrap(), Some("persisted".to_string()));
    }

    #[test]
    fn test_rejects_slot_with_separator() {
        let dir = TempDir::new().unwrap();
        assert!(FileTokenStore::new(dir.path(), "../escape").is_err());
        assert!(FileTokenStore::new(dir.path(), "").is_err());
    }

    #[test]
    #[serial]
    fn test_new_default_honours_env() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("MARATHON_TOKEN_DIR", dir.path());
        let store = FileTokenStore::new_default().unwrap();
        std::env::remove_var("MARATHON_TOKEN_DIR");
        assert_eq!(store.slot_path(), dir.path().join(DEFAULT_SLOT));
    }
}
