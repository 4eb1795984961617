//! API middleware
//!
//! Shared application state, the JSON error type, and token authentication.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::repositories::{
    SqlxPostRepository, SqlxRecipeRepository, SqlxTagRepository, SqlxTokenRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    FieldErrors, PostService, RecipeService, RecipeServiceError, TagService, TagServiceError,
    UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub recipe_service: Arc<RecipeService>,
    pub tag_service: Arc<TagService>,
    pub post_service: Arc<PostService>,
}

impl AppState {
    /// Wire the SQLx repositories and services over one pool
    pub fn new(pool: DynDatabasePool, auth: &AuthConfig) -> Self {
        let user_service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTokenRepository::boxed(pool.clone()),
        )
        .with_min_password_length(auth.min_password_length);

        Self {
            user_service: Arc::new(user_service),
            recipe_service: Arc::new(RecipeService::new(SqlxRecipeRepository::boxed(pool.clone()))),
            tag_service: Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()))),
            post_service: Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone()))),
            pool,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))
    }
}

const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// JSON body of an error response.
///
/// Field validation errors are a map of field name to messages; everything
/// else is `{"detail": "..."}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiErrorBody {
    Detail { detail: String },
    Fields(FieldErrors),
}

/// Error response for API errors
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody::Detail {
                detail: detail.into(),
            },
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found.")
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn validation_error(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiErrorBody::Fields(errors),
        }
    }

    pub fn method_not_allowed(method: &Method) -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method \"{}\" not allowed.", method),
        )
    }

    /// Log the cause and answer with a generic 500
    pub fn internal_error(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported media type in request.",
            ),
            other => Self::bad_request(format!("JSON parse error - {}", other.body_text())),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::ValidationError(errors) => Self::validation_error(errors),
            UserServiceError::InvalidToken | UserServiceError::InactiveUser => {
                Self::unauthorized(err.to_string())
            }
            UserServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::NotFound(_) => Self::not_found(),
            RecipeServiceError::ValidationError(errors) => Self::validation_error(errors),
            RecipeServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(_) => Self::not_found(),
            TagServiceError::ValidationError(errors) => Self::validation_error(errors),
            TagServiceError::InternalError(e) => Self::internal_error(format!("{:#}", e)),
        }
    }
}

/// Extract the token key from an `Authorization: Token <key>` header.
///
/// `Bearer` is accepted as a synonym. Headers with another scheme are
/// ignored (`Ok(None)`); a recognised scheme with a malformed value is an
/// error.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid token header. Token string should not contain invalid characters."))?;

    let mut parts = value.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") => {}
        _ => return Ok(None),
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(ApiError::unauthorized("Invalid token header. No credentials provided.")),
        (Some(_), Some(_)) => Err(ApiError::unauthorized(
            "Invalid token header. Token string should not contain spaces.",
        )),
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_token(request.headers())?
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?
        .to_string();

    let user = state.user_service.authenticate_token(&key).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Method fallback: a DRF-style 405 body instead of an empty response
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(&method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&headers("Token abc123")).unwrap(), Some("abc123"));
        assert_eq!(extract_token(&headers("Bearer abc123")).unwrap(), Some("abc123"));
        assert_eq!(extract_token(&headers("token abc123")).unwrap(), Some("abc123"));
        assert_eq!(extract_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(extract_token(&headers("Basic dXNlcjpwYXNz")).unwrap(), None);
    }

    #[test]
    fn test_extract_token_malformed() {
        assert!(extract_token(&headers("Token")).is_err());
        assert!(extract_token(&headers("Token a b")).is_err());
    }

    #[test]
    fn test_error_bodies() {
        let detail = serde_json::to_value(ApiError::not_found().body).unwrap();
        let fields = serde_json::to_value(
            ApiError::validation_error(FieldErrors::single("email", "This field is required.")).body,
        )
        .unwrap();

        assert_eq!(detail, serde_json::json!({"detail": "Not found."}));
        assert_eq!(fields, serde_json::json!({"email": ["This field is required."]}));
    }
}
