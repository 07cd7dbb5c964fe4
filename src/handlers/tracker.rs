use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::database::Tracker;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Accepts the spellings a boolean path segment is commonly sent with
fn parse_status(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// PUT /habits/tracker/:tracker_id/:status - mark a tracker done or not done.
///
/// Ownership is derived from the tracker's habit; a non-owner gets 409.
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<(i64, String)>, PathRejection>,
) -> Result<Json<Tracker>, ApiError> {
    let Path((tracker_id, status)) = path?;
    let status = parse_status(&status)
        .ok_or_else(|| ApiError::invalid_field("status", format!("'{}' is not a boolean", status)))?;

    let tracker = state
        .habits
        .set_tracker_status(user.id, tracker_id, status)
        .await
        .map_err(|e| {
            tracing::debug!("Tracker {} update by user {} refused: {}", tracker_id, user.id, e);
            ApiError::from(e)
        })?;

    Ok(Json(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_segments() {
        assert_eq!(parse_status("true"), Some(true));
        assert_eq!(parse_status("1"), Some(true));
        assert_eq!(parse_status("False"), Some(false));
        assert_eq!(parse_status("0"), Some(false));
        assert_eq!(parse_status("maybe"), None);
        assert_eq!(parse_status("t"), None);
    }
}
