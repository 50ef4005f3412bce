//! REST adapter for a Firebase-compatible identity service.
//!
//! Talks to the Identity Toolkit (`/v1/accounts:*`) and Secure Token
//! (`/v1/token`) endpoints. The signed-in user (principal plus id/refresh
//! tokens) is kept in memory and, when a user file is configured, mirrored to
//! disk as JSON so a restarted process reports the same principal on its first
//! change notification.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::{FederatedCredential, Principal};
use super::provider::{IdentityListeners, IdentityProvider, IdentitySubscription};
use crate::error_handling::types::ProviderError;

/// Seconds before expiry at which a cached id token is refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: String,
    pub identity_endpoint: String,
    pub securetoken_endpoint: String,
    /// Where the signed-in user is persisted. `None` keeps it in memory only.
    pub user_file: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    principal: Principal,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredUser {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS) <= now
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountResponse>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

pub struct FirebaseIdentityProvider {
    settings: FirebaseSettings,
    client: reqwest::Client,
    user: Mutex<Option<StoredUser>>,
    listeners: IdentityListeners,
}

impl FirebaseIdentityProvider {
    pub fn new(settings: FirebaseSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let user = settings.user_file.as_ref().and_then(|path| {
            let raw = fs::read_to_string(path).ok()?;
            match serde_json::from_str::<StoredUser>(&raw) {
                Ok(u) => {
                    info!("Restored signed-in user {} from {}", u.principal.identifier, path.display());
                    Some(u)
                }
                Err(e) => {
                    warn!("Ignoring unreadable user file {}: {}", path.display(), e);
                    None
                }
            }
        });

        let listeners = IdentityListeners::new(user.as_ref().map(|u| u.principal.clone()));
        Ok(Self {
            settings,
            client,
            user: Mutex::new(user),
            listeners,
        })
    }

    fn accounts_url(&self, op: &str) -> String {
        format!(
            "{}/v1/accounts:{}",
            self.settings.identity_endpoint.trim_end_matches('/'),
            op
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/v1/token",
            self.settings.securetoken_endpoint.trim_end_matches('/')
        )
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R, ProviderError> {
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return match resp.json::<ErrorEnvelope>().await {
                Ok(envelope) => {
                    debug!("Identity provider refused {}: {}", url, envelope.error.message);
                    Err(ProviderError::Rejected(envelope.error.message))
                }
                Err(_) => Err(ProviderError::Transport(format!("HTTP {}", status))),
            };
        }

        resp.json::<R>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    fn current_user(&self) -> Option<StoredUser> {
        self.user.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replaces the signed-in user, mirrors it to disk and notifies listeners.
    fn set_user(&self, user: Option<StoredUser>) {
        let change = user.as_ref().map(|u| u.principal.clone());
        self.persist(user.as_ref());
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = user;
        self.listeners.publish(change);
    }

    fn persist(&self, user: Option<&StoredUser>) {
        let Some(path) = self.settings.user_file.as_ref() else {
            return;
        };
        match user {
            Some(u) => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        warn!("Failed to create {}: {}", parent.display(), e);
                        return;
                    }
                }
                let written = serde_json::to_string_pretty(u)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| fs::write(path, raw).map_err(|e| e.to_string()));
                if let Err(e) = written {
                    warn!("Failed to persist signed-in user to {}: {}", path.display(), e);
                }
            }
            None => {
                if path.exists() {
                    if let Err(e) = fs::remove_file(path) {
                        warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
            }
        }
    }

    fn stored_user_from(account: AccountResponse) -> Result<StoredUser, ProviderError> {
        let id_token = account
            .id_token
            .ok_or_else(|| ProviderError::MalformedResponse("missing idToken".into()))?;
        let refresh_token = account
            .refresh_token
            .ok_or_else(|| ProviderError::MalformedResponse("missing refreshToken".into()))?;
        if account.local_id.is_empty() {
            return Err(ProviderError::MalformedResponse("empty localId".into()));
        }
        Ok(StoredUser {
            principal: Principal {
                identifier: account.local_id,
                display_name: account.display_name,
                email: account.email.unwrap_or_default(),
                avatar_url: account.photo_url,
            },
            id_token,
            refresh_token,
            expires_at: expiry_from(account.expires_in.as_deref()),
        })
    }

    /// Fills profile fields the sign-in response leaves out.
    async fn with_profile(&self, mut user: StoredUser) -> StoredUser {
        let lookup: Result<LookupResponse, ProviderError> = self
            .post(self.accounts_url("lookup"), &LookupRequest { id_token: &user.id_token })
            .await;
        match lookup {
            Ok(found) => {
                if let Some(account) = found.users.into_iter().next() {
                    if account.display_name.is_some() {
                        user.principal.display_name = account.display_name;
                    }
                    if account.photo_url.is_some() {
                        user.principal.avatar_url = account.photo_url;
                    }
                }
            }
            Err(e) => warn!("Profile lookup failed, continuing without it: {}", e),
        }
        user
    }

    async fn refresh(&self, user: &StoredUser) -> Result<StoredUser, ProviderError> {
        debug!("Refreshing id token for {}", user.principal.identifier);
        let refreshed: RefreshResponse = self
            .post(
                self.token_url(),
                &RefreshRequest {
                    grant_type: "refresh_token",
                    refresh_token: &user.refresh_token,
                },
            )
            .await?;
        Ok(StoredUser {
            principal: user.principal.clone(),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_from(Some(&refreshed.expires_in)),
        })
    }

    /// Returns the current user with a token that is not about to expire.
    async fn fresh_user(&self) -> Result<StoredUser, ProviderError> {
        let user = self.current_user().ok_or(ProviderError::NoCurrentUser)?;
        if !user.needs_refresh(Utc::now()) {
            return Ok(user);
        }
        let refreshed = self.refresh(&user).await?;
        let mut slot = self.user.lock().unwrap_or_else(|e| e.into_inner());
        // Only keep the refresh if nobody signed in or out while it was in flight
        let same_user = slot
            .as_ref()
            .is_some_and(|current| current.principal.identifier == refreshed.principal.identifier);
        if !same_user {
            return Err(ProviderError::NoCurrentUser);
        }
        *slot = Some(refreshed.clone());
        drop(slot);
        self.persist(Some(&refreshed));
        Ok(refreshed)
    }
}

fn expiry_from(expires_in: Option<&str>) -> DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Utc::now() + chrono::Duration::seconds(secs)
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    fn subscribe(&self) -> IdentitySubscription {
        self.listeners.subscribe()
    }

    fn unsubscribe(&self, id: Uuid) {
        self.listeners.unsubscribe(id)
    }

    async fn id_token(&self, principal: &Principal) -> Result<String, ProviderError> {
        let user = self.fresh_user().await?;
        if user.principal.identifier != principal.identifier {
            return Err(ProviderError::NoCurrentUser);
        }
        Ok(user.id_token)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Principal, ProviderError> {
        let account: AccountResponse = self
            .post(
                self.accounts_url("signUp"),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let user = Self::stored_user_from(account)?;
        let principal = user.principal.clone();
        info!("Created identity {}", principal.identifier);
        self.set_user(Some(user));
        Ok(principal)
    }

    async fn update_profile(
        &self,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Principal, ProviderError> {
        let user = self.fresh_user().await?;
        let account: AccountResponse = self
            .post(
                self.accounts_url("update"),
                &UpdateRequest {
                    id_token: &user.id_token,
                    display_name,
                    photo_url: avatar_url,
                    return_secure_token: true,
                },
            )
            .await?;

        let mut updated = user;
        updated.principal.display_name = account.display_name.or(display_name.map(String::from));
        updated.principal.avatar_url = account.photo_url.or(avatar_url.map(String::from));
        if let (Some(id_token), Some(refresh_token)) = (account.id_token, account.refresh_token) {
            updated.id_token = id_token;
            updated.refresh_token = refresh_token;
            updated.expires_at = expiry_from(account.expires_in.as_deref());
        }
        let principal = updated.principal.clone();
        debug!("Updated profile of {}", principal.identifier);
        self.set_user(Some(updated));
        Ok(principal)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        let account: AccountResponse = self
            .post(
                self.accounts_url("signInWithPassword"),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let user = self.with_profile(Self::stored_user_from(account)?).await;
        let principal = user.principal.clone();
        info!("Signed in {}", principal.identifier);
        self.set_user(Some(user));
        Ok(principal)
    }

    async fn sign_in_with_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Principal, ProviderError> {
        let account: AccountResponse = self
            .post(
                self.accounts_url("signInWithIdp"),
                &IdpRequest {
                    post_body: format!(
                        "id_token={}&providerId={}",
                        credential.id_token, credential.provider_id
                    ),
                    request_uri: "http://localhost",
                    return_secure_token: true,
                    return_idp_credential: true,
                },
            )
            .await?;
        let user = Self::stored_user_from(account)?;
        let principal = user.principal.clone();
        info!("Signed in {} via {}", principal.identifier, credential.provider_id);
        self.set_user(Some(user));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(user) = self.current_user() {
            info!("Signing out {}", user.principal.identifier);
        }
        self.set_user(None);
        Ok(())
    }
}
