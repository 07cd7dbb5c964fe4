use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::AuthConfig;

/// Identity resolved by the auth service. Only the id is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected by auth service")]
    Unauthorized,

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer credential into a user identity
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn check_token(&self, credential: &str) -> Result<AuthUser, AuthError>;
}

/// Auth gateway backed by the external service's `/users/check-token` endpoint
#[derive(Debug, Clone)]
pub struct HttpAuthGateway {
    client: reqwest::Client,
    check_url: Url,
}

impl HttpAuthGateway {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let check_url = check_token_url(&config.service_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, check_url })
    }

    pub fn check_url(&self) -> &Url {
        &self.check_url
    }
}

fn check_token_url(service_url: &Url) -> Result<Url, AuthError> {
    let base = service_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/users/check-token", base))
        .map_err(|e| AuthError::Unavailable(format!("invalid auth service URL: {}", e)))
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn check_token(&self, credential: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .post(self.check_url.clone())
            .header(reqwest::header::AUTHORIZATION, credential)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Auth service request failed: {}", e);
                AuthError::Unavailable(e.to_string())
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AuthError::Unauthorized),
            status if status.is_success() => response.json::<AuthUser>().await.map_err(|e| {
                tracing::warn!("Auth service returned an unreadable user: {}", e);
                AuthError::Unavailable(format!("invalid user payload: {}", e))
            }),
            status => {
                tracing::warn!("Auth service responded with {}", status);
                Err(AuthError::Unavailable(format!("unexpected status {}", status)))
            }
        }
    }
}
