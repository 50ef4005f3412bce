//! Outgoing request builder with a shared default credential.
//!
//! Every request built through an [`ApiClient`] carries
//! `Authorization: Bearer <token>` while a credential is set, and no
//! `Authorization` header at all once it is cleared. Clones share the same
//! credential slot, so the session layer can attach or drop it for every
//! consumer at once.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};

use crate::error_handling::types::ConfigError;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    credential: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credential: Arc::new(RwLock::new(None)),
        })
    }

    /// Absolute URL for `path` below the API base, e.g. `auth/login`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn set_bearer_token(&self, token: &str) {
        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.to_string());
        debug!("Default Authorization credential attached");
    }

    pub fn clear_bearer_token(&self) {
        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            debug!("Default Authorization credential removed");
        }
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The header value attached to outgoing requests, if any.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer_token().map(|t| format!("Bearer {}", t))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.endpoint(path));
        match self.authorization_header() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:5000/api/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let api = client();
        assert_eq!(api.endpoint("auth/login"), "http://localhost:5000/api/auth/login");
        assert_eq!(api.endpoint("/marathons"), "http://localhost:5000/api/marathons");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url", Duration::from_secs(5)),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn requests_carry_bearer_while_set() {
        let api = client();
        let shared = api.clone();
        shared.set_bearer_token("abc123");

        let req = api.get("marathons").build().unwrap();
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer abc123"
        );
        assert_eq!(api.authorization_header().as_deref(), Some("Bearer abc123"));
    }

    #[test]
    fn cleared_credential_removes_header_entirely() {
        let api = client();
        api.set_bearer_token("abc123");
        api.clear_bearer_token();

        let req = api.post("marathons").build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
        assert_eq!(api.bearer_token(), None);
    }
}
