use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

pub use crate::auth::AuthUser;

/// Authentication middleware that resolves the bearer credential through the
/// auth gateway and injects the `AuthUser` into request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = extract_credential(&headers).map_err(|msg| {
        tracing::debug!("Rejecting request: {}", msg);
        ApiError::unauthorized(msg)
    })?;

    let user = state.auth.check_token(&credential).await?;
    tracing::debug!("Authenticated user {}", user.id);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Raw `Authorization` header value, forwarded to the auth service verbatim
fn extract_credential(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if auth_str.trim().is_empty() {
        return Err("Empty Authorization header".to_string());
    }

    Ok(auth_str.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_header_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_credential(&headers).unwrap(), "Bearer abc.def");
    }

    #[test]
    fn rejects_missing_or_blank_header() {
        assert!(extract_credential(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("   "));
        assert!(extract_credential(&headers).is_err());
    }
}
