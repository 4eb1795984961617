//! User API endpoints
//!
//! - POST /api/user/create/ - Register
//! - POST /api/user/token/ - Obtain the API token
//! - GET|PUT|PATCH /api/user/me/ - Own profile

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{method_not_allowed, ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, UpdateUserInput, User};

/// Request body for registration and profile updates
#[derive(Debug, Default, Deserialize)]
pub struct UserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Request body for the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of a user. The password never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Routes that need no credentials
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/create/", post(create_user).fallback(method_not_allowed))
        .route("/token/", post(create_token).fallback(method_not_allowed))
}

/// Routes for the authenticated user (wrap with `require_auth`)
pub fn protected_router() -> Router<AppState> {
    Router::new().route(
        "/me/",
        get(get_me)
            .put(replace_me)
            .patch(update_me)
            .fallback(method_not_allowed),
    )
}

/// POST /api/user/create/
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;

    let input = CreateUserInput {
        email: req.email,
        password: req.password,
        name: req.name,
    };
    let user = state.user_service.create_user(input).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/user/token/
async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = payload?;

    let token = state
        .user_service
        .obtain_token(req.email.as_deref(), req.password.as_deref())
        .await?;

    Ok(Json(TokenResponse { token: token.key }))
}

/// GET /api/user/me/
async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /api/user/me/
async fn replace_me(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    update_profile(state, user, payload, false).await
}

/// PATCH /api/user/me/
async fn update_me(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    update_profile(state, user, payload, true).await
}

async fn update_profile(
    state: AppState,
    user: User,
    payload: Result<Json<UserRequest>, JsonRejection>,
    partial: bool,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(req) = payload?;

    let input = UpdateUserInput {
        email: req.email,
        name: req.name,
        password: req.password,
    };
    let updated = state.user_service.update_profile(&user, input, partial).await?;

    Ok(Json(updated.into()))
}
