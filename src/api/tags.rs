//! Tag API endpoints
//!
//! - GET/POST /api/recipe/tags/
//! - PUT/PATCH/DELETE /api/recipe/tags/{id}/

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{method_not_allowed, ApiError, AppState, AuthenticatedUser};
use crate::models::{Tag, TagInput};

/// Response for a single tag
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            description: tag.description,
        }
    }
}

/// Build the tag router (wrap with `require_auth`)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tags/",
            get(list_tags).post(create_tag).fallback(method_not_allowed),
        )
        .route(
            "/tags/{id}/",
            put(replace_tag)
                .patch(update_tag)
                .delete(delete_tag)
                .fallback(method_not_allowed),
        )
}

/// GET /api/recipe/tags/
async fn list_tags(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state.tag_service.list(&user).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// POST /api/recipe/tags/
async fn create_tag(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let Json(input) = payload?;
    let tag = state.tag_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

async fn replace_tag(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<Json<TagResponse>, ApiError> {
    let Json(input) = payload?;
    let tag = state.tag_service.update(&user, id, input, false).await?;
    Ok(Json(tag.into()))
}

async fn update_tag(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<Json<TagResponse>, ApiError> {
    let Json(input) = payload?;
    let tag = state.tag_service.update(&user, id, input, true).await?;
    Ok(Json(tag.into()))
}

async fn delete_tag(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
