//! Identity-provider callbacks to application session state.
//!
//! Every accepted identity change bumps a generation counter. The exchange for
//! a principal runs as its own task tagged with the generation that started it;
//! when it settles, the result is applied only if that generation is still the
//! current one. A slower exchange overtaken by a newer change (or by a
//! sign-out) therefore never writes storage, the credential or the state.
//!
//! Storage, credential and state writes happen under the tracker lock, with no
//! `.await` while it is held.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use super::session::Session;
use super::session_state::{SessionEvent, SessionState};
use super::session_store::SessionStore;
use crate::error_handling::types::{AuthError, ProviderError, SessionExchangeError, StorageError};
use crate::identity::{FederatedCredential, IdentityChange, IdentityProvider, Principal};
use crate::network::{ApiClient, ExchangeRequest, SessionBackend};
use crate::notification::{Notice, Notifier};
use crate::storage::TokenStore;

#[derive(Default)]
struct ExchangeTracker {
    generation: u64,
    /// Last principal accepted from the provider; `None` once signed out.
    principal: Option<Principal>,
}

pub struct SessionExchanger {
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn SessionBackend>,
    token_store: Arc<dyn TokenStore>,
    api: ApiClient,
    store: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    tracker: Mutex<ExchangeTracker>,
}

impl SessionExchanger {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        token_store: Arc<dyn TokenStore>,
        api: ApiClient,
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            backend,
            token_store,
            api,
            store,
            notifier,
            tracker: Mutex::new(ExchangeTracker::default()),
        }
    }

    /// Handles one identity-provider notification.
    ///
    /// A signed-in principal that differs from the last accepted one moves the
    /// store to Loading and spawns the exchange; the returned handle resolves
    /// once that exchange has settled. Repeating the same principal is a no-op.
    /// A sign-out clears the stored token and credential and resolves to
    /// Unauthenticated immediately.
    pub fn on_identity_changed(self: &Arc<Self>, change: IdentityChange) -> Option<JoinHandle<()>> {
        let mut tracker = self.lock_tracker();
        match change {
            Some(principal) => {
                if tracker.principal.as_ref() == Some(&principal) {
                    debug!("Repeat notification for {}, nothing to do", principal.identifier);
                    return None;
                }
                tracker.generation += 1;
                tracker.principal = Some(principal.clone());
                let generation = tracker.generation;
                info!(
                    "Identity changed to {} (generation {})",
                    principal.identifier, generation
                );
                self.raise(self.store.apply(SessionEvent::PrincipalChanged));
                drop(tracker);
                Some(self.spawn_exchange(principal, generation))
            }
            None => {
                tracker.generation += 1;
                tracker.principal = None;
                info!("Identity cleared (generation {})", tracker.generation);
                self.clear_credentials();
                self.raise(self.store.apply(SessionEvent::SignedOut));
                None
            }
        }
    }

    /// Runs a fresh exchange for the signed-in principal after a failed one.
    ///
    /// Returns `None` unless the store is in the Error state with a principal
    /// still signed in.
    pub fn retry(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut tracker = self.lock_tracker();
        if !matches!(self.store.snapshot(), SessionState::Error(_)) {
            debug!("Retry requested outside of the Error state, ignoring");
            return None;
        }
        let principal = tracker.principal.clone()?;
        tracker.generation += 1;
        let generation = tracker.generation;
        info!("Retrying session exchange for {}", principal.identifier);
        self.raise(self.store.apply(SessionEvent::PrincipalChanged));
        drop(tracker);
        Some(self.spawn_exchange(principal, generation))
    }

    /// Makes every in-flight exchange stale without touching the state.
    pub fn invalidate(&self) {
        let mut tracker = self.lock_tracker();
        tracker.generation += 1;
        debug!("Exchanges before generation {} invalidated", tracker.generation);
    }

    /// Attaches a previously persisted token as the outgoing credential.
    ///
    /// Does not change the state: the store stays Loading until the provider
    /// reports.
    pub fn restore_credential(&self) -> Result<Option<String>, StorageError> {
        let token = self.token_store.load()?;
        if let Some(token) = token.as_deref() {
            self.api.set_bearer_token(token);
        }
        Ok(token)
    }

    /// Waits until signing in `principal` has settled: a session for exactly
    /// that principal, or an Error raised while it was the accepted one.
    ///
    /// An Error left behind by an earlier principal does not count, even if the
    /// change to `principal` has not reached the exchanger yet.
    pub async fn settled_for(&self, principal: &Principal) -> SessionState {
        let mut rx = self.store.subscribe();
        loop {
            rx.borrow_and_update();
            if let Some(state) = self.settled_state(principal) {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.store.snapshot();
            }
        }
    }

    fn settled_state(&self, principal: &Principal) -> Option<SessionState> {
        // State and accepted principal only change together under the tracker lock
        let tracker = self.lock_tracker();
        let state = self.store.snapshot();
        let settled = match &state {
            SessionState::Authenticated(session) => session.principal == *principal,
            SessionState::Error(_) => tracker.principal.as_ref() == Some(principal),
            _ => false,
        };
        settled.then_some(state)
    }

    fn spawn_exchange(self: &Arc<Self>, principal: Principal, generation: u64) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_exchange(principal, generation).await })
    }

    async fn run_exchange(&self, principal: Principal, generation: u64) {
        let outcome = self.exchange(&principal).await;

        let tracker = self.lock_tracker();
        if tracker.generation != generation {
            info!(
                "Discarding stale exchange for {} (generation {}, current {})",
                principal.identifier, generation, tracker.generation
            );
            return;
        }

        // Blocking write under the lock; a single small slot file keeps this short
        let persisted = outcome.and_then(|session| {
            self.token_store.save(&session.token)?;
            Ok(session)
        });
        match persisted {
            Ok(session) => {
                self.api.set_bearer_token(&session.token);
                info!("Session established for {}", principal.identifier);
                self.raise(self.store.apply(SessionEvent::ExchangeSucceeded(session)));
            }
            Err(e) => {
                error!("Session exchange for {} failed: {}", principal.identifier, e);
                self.raise(self.store.apply(SessionEvent::ExchangeFailed(e.to_string())));
            }
        }
        drop(tracker);
    }

    async fn exchange(&self, principal: &Principal) -> Result<Session, SessionExchangeError> {
        let id_token = self
            .provider
            .id_token(principal)
            .await
            .map_err(SessionExchangeError::IdentityToken)?;
        let request = ExchangeRequest {
            id_token,
            email: principal.email.clone(),
            name: principal.display_name.clone(),
            photo_url: principal.avatar_url.clone(),
        };
        let response = self.backend.exchange(&request).await?;
        Session::new(response.token, principal.clone())
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.token_store.clear() {
            error!("Failed to clear persisted session token: {}", e);
        }
        self.api.clear_bearer_token();
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Principal, AuthError> {
        let result = self
            .create_with_profile(email, password, display_name, avatar_url)
            .await;
        self.report(result, "Account created successfully!")
    }

    async fn create_with_profile(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Principal, ProviderError> {
        let created = self.provider.create_user(email, password).await?;
        if display_name.is_none() && avatar_url.is_none() {
            return Ok(created);
        }
        self.provider.update_profile(display_name, avatar_url).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let result = self.provider.sign_in_with_password(email, password).await;
        self.report(result, "Logged in successfully!")
    }

    pub async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, AuthError> {
        let result = self.provider.sign_in_with_federated(credential).await;
        let message = format!("Logged in with {} successfully!", credential.provider_name());
        self.report(result, &message)
    }

    /// Asks the provider to sign out. Local state follows through the
    /// provider's change notification.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match self.provider.sign_out().await {
            Ok(()) => {
                self.notifier.notify(&Notice::success("Logged out successfully!"));
                Ok(())
            }
            Err(e) => {
                warn!("Sign-out failed: {}", e);
                self.notifier.notify(&Notice::error("Error logging out"));
                Err(AuthError::ProviderUnavailable)
            }
        }
    }

    fn report<T>(&self, result: Result<T, ProviderError>, success: &str) -> Result<T, AuthError> {
        match result {
            Ok(value) => {
                self.notifier.notify(&Notice::success(success));
                Ok(value)
            }
            Err(e) => {
                let kind = AuthError::from(&e);
                warn!("Identity provider error: {} ({:?})", e, kind);
                self.notifier.notify(&Notice::error(kind.user_message()));
                Err(kind)
            }
        }
    }

    fn raise(&self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            self.notifier.notify(&notice);
        }
    }

    fn lock_tracker(&self) -> MutexGuard<'_, ExchangeTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }
}
