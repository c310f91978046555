// ViewerContext Middleware - resolves the bearer token into a request-scoped viewer
// Handlers only ever see the ViewerContext, never the raw header

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{
        database::DatabaseInterface,
        security::{SecurityService, TokenType},
        viewer::ViewerContext,
    },
};

/// Trait for application state that can authenticate requests
pub trait HasAuthentication {
    fn security(&self) -> &Arc<SecurityService>;
    fn database(&self) -> &Arc<dyn DatabaseInterface>;
}

/// Creates the ViewerContext for every request and injects it into request extensions.
///
/// No Authorization header yields an anonymous viewer; a header that does not
/// carry a valid access token for an active user is rejected with 401.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasAuthentication + Clone + Send + Sync + 'static,
{
    let token = extract_bearer_token(request.headers())?;
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match token {
        Some(token) => resolve_viewer(&app_state, &token, request_id).await?,
        None => ViewerContext::anonymous(request_id),
    };
    debug!(request_id = %viewer_context.request_id, actor = ?viewer_context.actor(), "viewer resolved");

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header, if any
fn extract_bearer_token(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| Some(token.to_string()))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))
}

async fn resolve_viewer<T: HasAuthentication>(
    app_state: &T,
    token: &str,
    request_id: String,
) -> AppResult<ViewerContext> {
    let claims = app_state.security().validate(token, TokenType::Access)?;
    let user = app_state
        .database()
        .get_user(claims.user_id()?)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    Ok(ViewerContext::authenticated_user(user.id, user.username, request_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_auth_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token123"));

        let token = extract_bearer_token(&headers).unwrap();
        assert_eq!(token.as_deref(), Some("token123"));
    }

    #[test]
    fn test_extract_auth_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_extract_auth_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
