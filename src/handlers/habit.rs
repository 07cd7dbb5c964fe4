use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::database::{models, Habit, HabitWithTrackers, NewHabit};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Body of `POST /habits/habit`. Description is optional here.
#[derive(Debug, Deserialize)]
pub struct CreateHabit {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Body of `PUT /habits/habit/:id`. Both fields are required, unlike on create.
#[derive(Debug, Deserialize)]
pub struct UpdateHabit {
    pub title: String,
    pub description: String,
}

fn require_title(title: Option<String>) -> Result<String, ApiError> {
    match title {
        Some(title) if !title.trim().is_empty() => Ok(title),
        Some(_) => Err(ApiError::invalid_field("title", "must not be empty")),
        None => Err(ApiError::invalid_field("title", "This field is required")),
    }
}

/// GET /habits/habit/:id - habit with all of its trackers
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<HabitWithTrackers>, ApiError> {
    let Path(id) = id?;
    let habit = state.habits.find_with_trackers(user.id, id).await?;
    Ok(Json(habit))
}

/// POST /habits/habit - create a habit and seed today's tracker
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateHabit>, JsonRejection>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    let Json(payload) = payload?;
    let title = require_title(payload.title)?;

    let new_habit = NewHabit {
        title,
        description: payload.description,
    };
    let habit = state
        .habits
        .create_with_tracker(user.id, new_habit, &models::today())
        .await?;

    tracing::info!("User {} created habit {}", user.id, habit.id);
    Ok((StatusCode::CREATED, Json(habit)))
}

/// PUT /habits/habit/:id - replace title and description
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateHabit>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let title = require_title(Some(payload.title))?;

    let habit = state
        .habits
        .update(user.id, id, &title, &payload.description)
        .await?;
    Ok(Json(habit))
}

/// DELETE /habits/habit/:id - delete a habit and its trackers
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let deleted = state.habits.delete_owned(user.id, id).await?;

    tracing::info!("User {} deleted habit {}", user.id, deleted);
    Ok(Json(json!({ "deleted": deleted })))
}
