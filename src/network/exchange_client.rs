use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::api_client::ApiClient;
use crate::error_handling::types::SessionExchangeError;

pub const EXCHANGE_PATH: &str = "auth/login";

/// Body of `POST {api}/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    #[serde(rename = "idToken")]
    pub id_token: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangeResponse {
    pub token: String,
}

/// Backend that turns an identity token into an application session token.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn exchange(
        &self,
        request: &ExchangeRequest,
    ) -> Result<ExchangeResponse, SessionExchangeError>;
}

pub struct HttpSessionBackend {
    api: ApiClient,
}

impl HttpSessionBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn exchange(
        &self,
        request: &ExchangeRequest,
    ) -> Result<ExchangeResponse, SessionExchangeError> {
        debug!("Exchanging identity token for {}", request.email);
        let resp = self
            .api
            .post(EXCHANGE_PATH)
            .json(request)
            .send()
            .await
            .map_err(|e| SessionExchangeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Session exchange answered HTTP {}", status);
            return Err(SessionExchangeError::Rejected(status.as_u16()));
        }

        let body: ExchangeResponse = resp
            .json()
            .await
            .map_err(|e| SessionExchangeError::MalformedResponse(e.to_string()))?;
        if body.token.trim().is_empty() {
            return Err(SessionExchangeError::MalformedResponse("empty token".into()));
        }
        Ok(body)
    }
}
