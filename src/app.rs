use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::auth::AuthGateway;
use crate::database::{self, HabitRepository};
use crate::handlers;
use crate::middleware::auth_middleware;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub habits: HabitRepository,
    pub auth: Arc<dyn AuthGateway>,
}

impl AppState {
    pub fn new(habits: HabitRepository, auth: Arc<dyn AuthGateway>) -> Self {
        Self { habits, auth }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/health", get(health))
        // Protected habit API
        .nest("/habits", habit_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn habit_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/habit", post(handlers::habit_post))
        .route(
            "/habit/:id",
            get(handlers::habit_get)
                .put(handlers::habit_put)
                .delete(handlers::habit_delete),
        )
        .route("/tracker/:tracker_id/:status", put(handlers::tracker_put))
        .route("/list", get(handlers::list_get))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match database::health_check(state.habits.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
