use serde::Deserialize;

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_SECURETOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com";

/// Identity provider settings (`[identity]` table).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub api_key: String,
    pub identity_endpoint: String,
    pub securetoken_endpoint: String,
    /// Keep the signed-in user across restarts.
    pub persist_user: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            securetoken_endpoint: DEFAULT_SECURETOKEN_ENDPOINT.to_string(),
            persist_user: true,
        }
    }
}
