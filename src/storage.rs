//! Storage subsystem
//!
//! Durable storage for the application session token.
//!
//! Components:
//! - `token_store`: the TokenStore trait defining a single-slot API.
//! - `file_token_store`: filesystem-backed slot that survives restarts.
//! - `memory_token_store`: in-process slot for embedding and tests.

pub mod file_token_store;
pub mod memory_token_store;
pub mod token_store;

pub use file_token_store::FileTokenStore;
pub use memory_token_store::MemoryTokenStore;
pub use token_store::TokenStore;
