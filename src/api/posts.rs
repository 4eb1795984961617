//! Blog endpoints
//!
//! - GET /posts/ - Public list of posts

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{method_not_allowed, ApiError, AppState};
use crate::models::Post;

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/posts/", get(list_posts).fallback(method_not_allowed))
}

/// GET /posts/
async fn list_posts(State(state): State<AppState>) -> Result<Json<PostListResponse>, ApiError> {
    let posts = state
        .post_service
        .list()
        .await
        .map_err(|e| ApiError::internal_error(format!("{:#}", e)))?;

    Ok(Json(PostListResponse { posts }))
}
