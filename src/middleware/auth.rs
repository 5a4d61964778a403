use std::collections::HashMap;

use axum::{
    extract::{Path, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Caller identity taken from a verified token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            is_admin: claims.is_admin,
        }
    }
}

/// Store the caller in request extensions when a valid bearer token is sent.
///
/// Never rejects: a missing or bad token leaves the request anonymous and the
/// route guards decide.
pub async fn authenticate_jwt(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_jwt_from_headers(&headers) {
        match auth::decode_token(token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(e) => tracing::debug!("ignoring bearer token: {}", e),
        }
    }
    next.run(request).await
}

/// 401 unless the request carries an authenticated user.
pub async fn ensure_logged_in(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthUser>().is_none() {
        return ApiError::unauthorized("Unauthorized").into_response();
    }
    next.run(request).await
}

/// 401 unless the authenticated user is an admin.
pub async fn ensure_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin => next.run(request).await,
        _ => ApiError::unauthorized("Unauthorized").into_response(),
    }
}

/// 401 unless the caller is an admin or the user named by the `:username`
/// path segment.
pub async fn ensure_correct_user_or_admin(
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = request
        .extensions()
        .get::<AuthUser>()
        .map_or(false, |user| user.is_admin || params.get("username") == Some(&user.username));
    if !allowed {
        return ApiError::unauthorized("Unauthorized").into_response();
    }
    next.run(request).await
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers), Some("abc.def"));
    }

    #[test]
    fn ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer  "));
        assert_eq!(extract_jwt_from_headers(&headers), None);
    }
}
