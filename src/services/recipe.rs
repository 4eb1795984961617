//! Recipe service
//!
//! Per-user recipe CRUD. Callers always pass the owning user; recipes of
//! other users are reported as `NotFound`.

use crate::db::repositories::RecipeRepository;
use crate::models::{Price, PriceInput, Recipe, RecipeInput, User};
use crate::services::validation::{check_max_length, required_text, FieldErrors, REQUIRED};
use std::sync::Arc;

const MAX_TITLE_LENGTH: usize = 255;
const MAX_LINK_LENGTH: usize = 255;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    /// Recipe does not exist or belongs to someone else
    #[error("Recipe not found: {0}")]
    NotFound(i64),

    /// Invalid input, keyed by field
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for RecipeServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

pub struct RecipeService {
    repo: Arc<dyn RecipeRepository>,
}

impl RecipeService {
    pub fn new(repo: Arc<dyn RecipeRepository>) -> Self {
        Self { repo }
    }

    /// The user's recipes, newest first
    pub async fn list(&self, owner: &User) -> Result<Vec<Recipe>, RecipeServiceError> {
        Ok(self.repo.list_by_user(owner.id).await?)
    }

    pub async fn get(&self, owner: &User, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.repo
            .get_for_user(id, owner.id)
            .await?
            .ok_or(RecipeServiceError::NotFound(id))
    }

    /// Create a recipe owned by `owner`.
    ///
    /// `title`, `time_minutes` and `price` are required.
    pub async fn create(&self, owner: &User, input: RecipeInput) -> Result<Recipe, RecipeServiceError> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", input.title.as_deref());
        if input.time_minutes.is_none() {
            errors.add("time_minutes", REQUIRED);
        }
        let price = match &input.price {
            Some(price) => parse_price(&mut errors, price),
            None => {
                errors.add("price", REQUIRED);
                None
            }
        };
        let description = input.description.unwrap_or_default();
        let link = input.link.map(|l| l.trim().to_string()).unwrap_or_default();
        check_lengths(&mut errors, title.as_deref(), &link);
        errors.into_result()?;

        let (Some(title), Some(time_minutes), Some(price)) = (title, input.time_minutes, price) else {
            return Err(FieldErrors::single("title", REQUIRED).into());
        };

        let mut recipe = Recipe::new(owner.id, title, time_minutes, price);
        recipe.description = description;
        recipe.link = link;

        let created = self.repo.create(&recipe).await?;
        tracing::debug!(recipe_id = created.id, user_id = owner.id, "Created recipe");
        Ok(created)
    }

    /// Update a recipe.
    ///
    /// With `partial == false` the required fields must be present and the
    /// optional ones reset to empty when omitted (PUT semantics). Otherwise
    /// only the supplied fields change.
    pub async fn update(
        &self,
        owner: &User,
        id: i64,
        input: RecipeInput,
        partial: bool,
    ) -> Result<Recipe, RecipeServiceError> {
        let mut recipe = self.get(owner, id).await?;
        let mut errors = FieldErrors::new();

        if input.title.is_some() || !partial {
            if let Some(title) = required_text(&mut errors, "title", input.title.as_deref()) {
                recipe.title = title;
            }
        }
        match input.time_minutes {
            Some(time_minutes) => recipe.time_minutes = time_minutes,
            None if !partial => errors.add("time_minutes", REQUIRED),
            None => {}
        }
        match &input.price {
            Some(price) => {
                if let Some(price) = parse_price(&mut errors, price) {
                    recipe.price = price;
                }
            }
            None if !partial => errors.add("price", REQUIRED),
            None => {}
        }
        if input.description.is_some() || !partial {
            recipe.description = input.description.unwrap_or_default();
        }
        if input.link.is_some() || !partial {
            recipe.link = input.link.map(|l| l.trim().to_string()).unwrap_or_default();
        }

        check_lengths(&mut errors, Some(&recipe.title), &recipe.link);
        errors.into_result()?;

        Ok(self.repo.update(&recipe).await?)
    }

    pub async fn delete(&self, owner: &User, id: i64) -> Result<(), RecipeServiceError> {
        if !self.repo.delete(id, owner.id).await? {
            return Err(RecipeServiceError::NotFound(id));
        }
        tracing::debug!(recipe_id = id, user_id = owner.id, "Deleted recipe");
        Ok(())
    }
}

fn parse_price(errors: &mut FieldErrors, input: &PriceInput) -> Option<Price> {
    match input.parse() {
        Ok(price) => Some(price),
        Err(e) => {
            errors.add("price", e.to_string());
            None
        }
    }
}

fn check_lengths(errors: &mut FieldErrors, title: Option<&str>, link: &str) {
    if let Some(title) = title {
        check_max_length(errors, "title", title, MAX_TITLE_LENGTH);
    }
    check_max_length(errors, "link", link, MAX_LINK_LENGTH);
}
