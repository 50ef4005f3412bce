//! Identity provider integration.
//!
//! - `principal`: the user record reported by the provider.
//! - `provider`: the `IdentityProvider` trait and the shared listener registry.
//! - `firebase`: REST adapter for a Firebase-compatible identity service.

pub mod firebase;
pub mod principal;
pub mod provider;

pub use firebase::{FirebaseIdentityProvider, FirebaseSettings};
pub use principal::{FederatedCredential, Principal};
pub use provider::{IdentityChange, IdentityListeners, IdentityProvider, IdentitySubscription};
