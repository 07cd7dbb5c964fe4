use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::database::HabitWithTrackers;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /habits/list - every habit of the caller, each with its trackers
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<HabitWithTrackers>>, ApiError> {
    let habits = state.habits.list_owned(user.id).await?;
    Ok(Json(habits))
}
