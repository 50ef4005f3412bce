//! In-process fakes for the identity provider, the session backend and the notifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error_handling::types::{ProviderError, SessionExchangeError};
use crate::identity::{
    FederatedCredential, IdentityChange, IdentityListeners, IdentityProvider, IdentitySubscription,
    Principal,
};
use crate::network::{ExchangeRequest, ExchangeResponse, SessionBackend};
use crate::notification::{Notice, NoticeLevel, Notifier};

struct Account {
    password: String,
    principal: Principal,
}

pub(crate) struct FakeIdentityProvider {
    listeners: IdentityListeners,
    accounts: Mutex<HashMap<String, Account>>,
    sign_out_fails: AtomicBool,
    id_token_fails: AtomicBool,
    sign_in_attempts: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::with_current(None)
    }

    pub fn signed_in(principal: Principal) -> Self {
        Self::with_current(Some(principal))
    }

    fn with_current(current: IdentityChange) -> Self {
        Self {
            listeners: IdentityListeners::new(current),
            accounts: Mutex::new(HashMap::new()),
            sign_out_fails: AtomicBool::new(false),
            id_token_fails: AtomicBool::new(false),
            sign_in_attempts: AtomicUsize::new(0),
        }
    }

    /// Pushes a change to every subscriber as if the provider had observed it.
    pub fn emit(&self, change: IdentityChange) {
        self.listeners.publish(change);
    }

    pub fn register(&self, email: &str, password: &str, principal: Principal) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                principal,
            },
        );
    }

    pub fn set_sign_out_failure(&self, fails: bool) {
        self.sign_out_fails.store(fails, Ordering::SeqCst);
    }

    pub fn fail_id_token(&self, fails: bool) {
        self.id_token_fails.store(fails, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    pub fn sign_in_attempts(&self) -> usize {
        self.sign_in_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn subscribe(&self) -> IdentitySubscription {
        self.listeners.subscribe()
    }

    fn unsubscribe(&self, id: Uuid) {
        self.listeners.unsubscribe(id);
    }

    async fn id_token(&self, principal: &Principal) -> Result<String, ProviderError> {
        if self.id_token_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("token endpoint unreachable".into()));
        }
        match self.listeners.current() {
            Some(current) if current.identifier == principal.identifier => {
                Ok(format!("id-token-{}", principal.identifier))
            }
            _ => Err(ProviderError::NoCurrentUser),
        }
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Principal, ProviderError> {
        if !email.contains('@') {
            return Err(ProviderError::Rejected("INVALID_EMAIL".into()));
        }
        if password.len() < 6 {
            return Err(ProviderError::Rejected(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }
        let principal = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(ProviderError::Rejected("EMAIL_EXISTS".into()));
            }
            let principal = Principal::new(format!("uid-{}", accounts.len() + 1), email);
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    principal: principal.clone(),
                },
            );
            principal
        };
        self.listeners.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn update_profile(
        &self,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Principal, ProviderError> {
        let mut principal = self.listeners.current().ok_or(ProviderError::NoCurrentUser)?;
        if let Some(name) = display_name {
            principal.display_name = Some(name.to_string());
        }
        if let Some(url) = avatar_url {
            principal.avatar_url = Some(url.to_string());
        }
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&principal.email) {
            account.principal = principal.clone();
        }
        self.listeners.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        self.sign_in_attempts.fetch_add(1, Ordering::SeqCst);
        let principal = self
            .accounts
            .lock()
            .unwrap()
            .get(email)
            .filter(|a| a.password == password)
            .map(|a| a.principal.clone())
            .ok_or_else(|| ProviderError::Rejected("INVALID_LOGIN_CREDENTIALS".into()))?;
        self.listeners.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, ProviderError> {
        let principal = Principal::new(
            format!("fed-{}", credential.id_token),
            format!("{}@federated.test", credential.id_token),
        );
        self.listeners.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("network down".into()));
        }
        self.listeners.publish(None);
        Ok(())
    }
}

/// Records exchange calls and answers from a per-email script.
///
/// Unscripted emails get `token-<email>`. A held email blocks its exchange
/// until the returned sender fires or is dropped.
#[derive(Default)]
pub(crate) struct FakeSessionBackend {
    calls: Mutex<Vec<ExchangeRequest>>,
    responses: Mutex<HashMap<String, Result<String, SessionExchangeError>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    completed: AtomicUsize,
}

impl FakeSessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, email: &str, token: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(email.to_string(), Ok(token.to_string()));
    }

    pub fn fail_for(&self, email: &str, err: SessionExchangeError) {
        self.responses.lock().unwrap().insert(email.to_string(), Err(err));
    }

    pub fn hold(&self, email: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(email.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<ExchangeRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Polls until at least `n` exchanges have been requested.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Polls until at least `n` exchanges have returned.
    pub async fn wait_for_completed(&self, n: usize) {
        while self.completed() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

#[async_trait]
impl SessionBackend for FakeSessionBackend {
    async fn exchange(
        &self,
        request: &ExchangeRequest,
    ) -> Result<ExchangeResponse, SessionExchangeError> {
        self.calls.lock().unwrap().push(request.clone());
        let gate = self.gates.lock().unwrap().remove(&request.email);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let scripted = self.responses.lock().unwrap().get(&request.email).cloned();
        self.completed.fetch_add(1, Ordering::SeqCst);
        let token = scripted.unwrap_or_else(|| Ok(format!("token-{}", request.email)))?;
        Ok(ExchangeResponse { token })
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NoticeLevel::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NoticeLevel::Success)
    }

    fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
