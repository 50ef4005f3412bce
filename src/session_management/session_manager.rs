use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::session_exchanger::SessionExchanger;
use super::session_store::SessionStore;
use crate::error_handling::types::SessionError;
use crate::identity::{IdentityProvider, IdentitySubscription};
use crate::network::{ApiClient, SessionBackend};
use crate::notification::Notifier;
use crate::storage::TokenStore;

struct ActiveSubscription {
    id: Uuid,
    listener: JoinHandle<()>,
}

/// The structure related to session management
///
/// Owns the session store and the exchanger, and ties them to the identity
/// provider for the lifetime of the application.
///
/// # Fields Overview
///
/// - `store`: the session state consumers read from
/// - `exchanger`: turns provider notifications into state, and runs the auth operations
/// - `provider`: the identity provider the manager subscribes to
/// - `subscription`: the live provider subscription between `init` and `teardown`
pub struct SessionManager {
    store: Arc<SessionStore>,
    exchanger: Arc<SessionExchanger>,
    provider: Arc<dyn IdentityProvider>,
    subscription: Mutex<Option<ActiveSubscription>>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        token_store: Arc<dyn TokenStore>,
        api: ApiClient,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let exchanger = Arc::new(SessionExchanger::new(
            provider.clone(),
            backend,
            token_store,
            api,
            store.clone(),
            notifier,
        ));
        Self {
            store,
            exchanger,
            provider,
            subscription: Mutex::new(None),
        }
    }

    /// Mounts the manager: attaches any persisted credential, then subscribes
    /// to the identity provider. Must run inside a tokio runtime.
    pub fn init(&self) -> Result<(), SessionError> {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }

        match self.exchanger.restore_credential() {
            Ok(Some(_)) => info!("Attached persisted session token as default credential"),
            Ok(None) => debug!("No persisted session token"),
            Err(e) => warn!("Could not read persisted session token: {}", e),
        }

        let IdentitySubscription { id, mut changes } = self.provider.subscribe();
        let exchanger = self.exchanger.clone();
        let listener = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let _ = exchanger.on_identity_changed(change);
            }
            debug!("Identity change stream closed");
        });

        *slot = Some(ActiveSubscription { id, listener });
        info!("Session manager mounted (subscription {})", id);
        Ok(())
    }

    /// Unmounts the manager: cancels the provider subscription and makes any
    /// in-flight exchange stale. Safe to call more than once.
    pub fn teardown(&self) {
        let active = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(active) = active {
            self.provider.unsubscribe(active.id);
            active.listener.abort();
            self.exchanger.invalidate();
            info!("Session manager unmounted (subscription {})", active.id);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn exchanger(&self) -> &Arc<SessionExchanger> {
        &self.exchanger
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
