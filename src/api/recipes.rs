//! Recipe API endpoints
//!
//! - GET/POST /api/recipe/recipes/
//! - GET/PUT/PATCH/DELETE /api/recipe/recipes/{id}/
//!
//! All routes are scoped to the authenticated user.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{method_not_allowed, ApiError, AppState, AuthenticatedUser};
use crate::models::{Price, Recipe, RecipeInput};

/// Recipe as shown in listings
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
}

impl From<Recipe> for RecipeResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
        }
    }
}

/// Single recipe, listing fields plus the description
#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub summary: RecipeResponse,
    pub description: String,
}

impl From<Recipe> for RecipeDetailResponse {
    fn from(mut recipe: Recipe) -> Self {
        let description = std::mem::take(&mut recipe.description);
        Self {
            summary: recipe.into(),
            description,
        }
    }
}

/// Build the recipe router (wrap with `require_auth`)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/",
            get(list_recipes).post(create_recipe).fallback(method_not_allowed),
        )
        .route(
            "/recipes/{id}/",
            get(get_recipe)
                .put(replace_recipe)
                .patch(update_recipe)
                .delete(delete_recipe)
                .fallback(method_not_allowed),
        )
}

/// GET /api/recipe/recipes/
async fn list_recipes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<RecipeResponse>>, ApiError> {
    let recipes = state.recipe_service.list(&user).await?;
    Ok(Json(recipes.into_iter().map(Into::into).collect()))
}

/// POST /api/recipe/recipes/
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeDetailResponse>), ApiError> {
    let Json(input) = payload?;
    let recipe = state.recipe_service.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// GET /api/recipe/recipes/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let recipe = state.recipe_service.get(&user, id).await?;
    Ok(Json(recipe.into()))
}

/// PUT /api/recipe/recipes/{id}/
async fn replace_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let Json(input) = payload?;
    let recipe = state.recipe_service.update(&user, id, input, false).await?;
    Ok(Json(recipe.into()))
}

/// PATCH /api/recipe/recipes/{id}/
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, ApiError> {
    let Json(input) = payload?;
    let recipe = state.recipe_service.update(&user, id, input, true).await?;
    Ok(Json(recipe.into()))
}

/// DELETE /api/recipe/recipes/{id}/
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
