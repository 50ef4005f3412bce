//! HTTP plumbing toward the application backend.
//!
//! - `api_client`: request builder holding the default bearer credential.
//! - `exchange_client`: the session exchange endpoint behind the `SessionBackend` trait.

pub mod api_client;
pub mod exchange_client;

pub use api_client::ApiClient;
pub use exchange_client::{
    ExchangeRequest, ExchangeResponse, HttpSessionBackend, SessionBackend, EXCHANGE_PATH,
};
