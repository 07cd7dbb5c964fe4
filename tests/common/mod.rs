#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use habit_tracker::app::{self, AppState};
use habit_tracker::auth::{AuthError, AuthGateway, AuthUser};
use habit_tracker::database::{memory_pool, HabitRepository};

/// Stand-in for the external auth service.
///
/// `Bearer user-<id>` resolves to that user, `Bearer down` simulates an outage,
/// anything else is rejected.
pub struct StubGateway;

#[async_trait]
impl AuthGateway for StubGateway {
    async fn check_token(&self, credential: &str) -> Result<AuthUser, AuthError> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);
        if token == "down" {
            return Err(AuthError::Unavailable("connection refused".to_string()));
        }
        token
            .strip_prefix("user-")
            .and_then(|id| id.parse().ok())
            .map(|id| AuthUser { id })
            .ok_or(AuthError::Unauthorized)
    }
}

pub struct TestApp {
    pub router: Router,
    pub habits: HabitRepository,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let habits = HabitRepository::new(memory_pool().await?);
        let state = AppState::new(habits.clone(), Arc::new(StubGateway));
        Ok(Self {
            router: app::router(state),
            habits,
        })
    }

    /// Send a request as `user` (None sends no Authorization header)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = user {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.habits.pool())
            .await?;
        Ok(count)
    }
}
