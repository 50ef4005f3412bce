use serde::{Deserialize, Serialize};

/// The signed-in end user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider-assigned opaque identifier, never empty for a real user.
    pub identifier: String,
    pub display_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl Principal {
    pub fn new<I: Into<String>, E: Into<String>>(identifier: I, email: E) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            email: email.into(),
            avatar_url: None,
        }
    }

    pub fn with_display_name<S: Into<String>>(mut self, name: S) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar_url<S: Into<String>>(mut self, url: S) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Name shown in navigation when the user has no display name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("User")
    }
}

/// Credential obtained from a federated sign-in flow (e.g. a Google OAuth id token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    pub provider_id: String,
    pub id_token: String,
}

impl FederatedCredential {
    pub fn google<S: Into<String>>(id_token: S) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            id_token: id_token.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        match self.provider_id.as_str() {
            "google.com" => "Google",
            other => other,
        }
    }
}
