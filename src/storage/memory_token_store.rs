use std::sync::Mutex;

use crate::error_handling::types::StorageError;
use crate::storage::token_store::TokenStore;

/// In-process token slot. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        self.slot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| StorageError::ReadFailed)
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::WriteFailed)?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::WriteFailed)?;
        *slot = None;
        Ok(())
    }
}
