//! Token Store Trait
//!
//! This module defines the `TokenStore` trait: a single named slot of durable
//! storage holding the current application session token as plain text.
//!
//! Implementors must make `save` replace the previous value and `clear`
//! idempotent. All methods return a `Result` to surface storage errors.

use crate::error_handling::types::StorageError;

pub trait TokenStore: Send + Sync {
    /// Reads the slot. `Ok(None)` means nothing is stored.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the slot content with `token`.
    fn save(&self, token: &str) -> Result<(), StorageError>;

    /// Empties the slot. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<(), StorageError>;
}
