//! Identity provider seam.
//!
//! The [`IdentityProvider`] trait is everything the session layer needs from an
//! external authentication service. Change notifications are delivered through
//! an [`IdentitySubscription`]: an ordered channel whose first message is the
//! provider's current determination (signed in or not), followed by one message
//! per later change.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::principal::{FederatedCredential, Principal};
use crate::error_handling::types::ProviderError;

/// A signed-in principal, or `None` once signed out.
pub type IdentityChange = Option<Principal>;

/// Handle returned by [`IdentityProvider::subscribe`].
pub struct IdentitySubscription {
    pub id: Uuid,
    pub changes: UnboundedReceiver<IdentityChange>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers a change listener. The current state is delivered immediately.
    fn subscribe(&self) -> IdentitySubscription;

    /// Drops the listener registered under `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: Uuid);

    /// Short-lived identity token for `principal`, who must be the current user.
    async fn id_token(&self, principal: &Principal) -> Result<String, ProviderError>;

    async fn create_user(&self, email: &str, password: &str) -> Result<Principal, ProviderError>;

    /// Updates the current user's profile and returns the updated principal.
    async fn update_profile(
        &self,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Principal, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError>;

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Listener registry shared by provider implementations.
///
/// Keeps the current user and fans every change out to all subscribers in
/// publication order. Publishing happens under one lock, so delivery to each
/// subscriber is serialized.
pub struct IdentityListeners {
    inner: Mutex<ListenersInner>,
}

struct ListenersInner {
    current: IdentityChange,
    senders: HashMap<Uuid, UnboundedSender<IdentityChange>>,
}

impl IdentityListeners {
    pub fn new(current: IdentityChange) -> Self {
        Self {
            inner: Mutex::new(ListenersInner {
                current,
                senders: HashMap::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> IdentitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut inner = self.lock();
        // Receiver is alive, the send cannot fail
        let _ = tx.send(inner.current.clone());
        inner.senders.insert(id, tx);
        debug!("Identity listener {} subscribed ({} total)", id, inner.senders.len());
        IdentitySubscription { id, changes: rx }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        let mut inner = self.lock();
        if inner.senders.remove(&id).is_some() {
            debug!("Identity listener {} unsubscribed", id);
        }
    }

    /// Records `change` as the current user and notifies every listener.
    pub fn publish(&self, change: IdentityChange) {
        let mut inner = self.lock();
        inner.current = change.clone();
        inner.senders.retain(|id, tx| {
            if tx.send(change.clone()).is_err() {
                warn!("Identity listener {} is gone, dropping it", id);
                return false;
            }
            true
        });
    }

    pub fn current(&self) -> IdentityChange {
        self.lock().current.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenersInner> {
        // A poisoned registry still holds consistent data: every mutation is a single insert/remove
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for IdentityListeners {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_current_state_first() {
        let listeners = IdentityListeners::new(Some(Principal::new("u1", "a@b.com")));
        let mut sub = listeners.subscribe();
        let first = sub.changes.recv().await.unwrap();
        assert_eq!(first.map(|p| p.identifier), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn changes_are_delivered_in_order() {
        let listeners = IdentityListeners::default();
        let mut sub = listeners.subscribe();
        listeners.publish(Some(Principal::new("u1", "a@b.com")));
        listeners.publish(None);

        assert_eq!(sub.changes.recv().await.unwrap(), None);
        assert!(sub.changes.recv().await.unwrap().is_some());
        assert_eq!(sub.changes.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsubscribed_listener_stops_receiving() {
        let listeners = IdentityListeners::default();
        let mut sub = listeners.subscribe();
        let _ = sub.changes.recv().await;
        listeners.unsubscribe(sub.id);
        assert_eq!(listeners.listener_count(), 0);

        listeners.publish(Some(Principal::new("u1", "a@b.com")));
        assert!(sub.changes.recv().await.is_none());
    }

    #[test]
    fn dropped_receivers_are_pruned_on_publish() {
        let listeners = IdentityListeners::default();
        let sub = listeners.subscribe();
        drop(sub);
        listeners.publish(None);
        assert_eq!(listeners.listener_count(), 0);
    }
}
