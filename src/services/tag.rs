//! Tag service
//!
//! Tags are private to their creator; there is no sharing or reuse across
//! users.

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagInput, User};
use crate::services::validation::{check_max_length, required_text, FieldErrors};
use std::sync::Arc;

const MAX_TAG_FIELD_LENGTH: usize = 255;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(i64),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for TagServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

/// Tag service for managing a user's tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// The user's tags ordered by name, descending
    pub async fn list(&self, owner: &User) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list_by_user(owner.id).await?)
    }

    /// Create a tag. The name is required; the description defaults to empty.
    pub async fn create(&self, owner: &User, input: TagInput) -> Result<Tag, TagServiceError> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", input.name.as_deref());
        let description = input.description.unwrap_or_default();
        check_tag_lengths(&mut errors, name.as_deref().unwrap_or_default(), &description);
        errors.into_result()?;

        let tag = Tag::new(owner.id, name.unwrap_or_default(), description);
        Ok(self.repo.create(&tag).await?)
    }

    /// Update a tag, PUT or PATCH style depending on `partial`
    pub async fn update(
        &self,
        owner: &User,
        id: i64,
        input: TagInput,
        partial: bool,
    ) -> Result<Tag, TagServiceError> {
        let mut tag = self
            .repo
            .get_for_user(id, owner.id)
            .await?
            .ok_or(TagServiceError::NotFound(id))?;
        let mut errors = FieldErrors::new();

        if input.name.is_some() || !partial {
            if let Some(name) = required_text(&mut errors, "name", input.name.as_deref()) {
                tag.name = name;
            }
        }
        if input.description.is_some() || !partial {
            tag.description = input.description.unwrap_or_default();
        }

        check_tag_lengths(&mut errors, &tag.name, &tag.description);
        errors.into_result()?;

        Ok(self.repo.update(&tag).await?)
    }

    /// Delete a tag
    pub async fn delete(&self, owner: &User, id: i64) -> Result<(), TagServiceError> {
        if self.repo.delete(id, owner.id).await? {
            Ok(())
        } else {
            Err(TagServiceError::NotFound(id))
        }
    }
}

fn check_tag_lengths(errors: &mut FieldErrors, name: &str, description: &str) {
    check_max_length(errors, "name", name, MAX_TAG_FIELD_LENGTH);
    check_max_length(errors, "description", description, MAX_TAG_FIELD_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTagRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup_test_service() -> (TagService, User, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let owner = users
            .create(&User::new("user@example.com", String::new(), "hash".to_string()))
            .await
            .expect("Failed to create user");
        let other = users
            .create(&User::new("user2@example.com", String::new(), "hash".to_string()))
            .await
            .expect("Failed to create user");

        (TagService::new(SqlxTagRepository::boxed(pool)), owner, other)
    }

    fn input(name: &str) -> TagInput {
        TagInput {
            name: Some(name.to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_tag() {
        let (service, owner, _) = setup_test_service().await;

        let tag = service.create(&owner, input("  Vegan ")).await.expect("Failed to create tag");

        assert_eq!(tag.name, "Vegan");
        assert_eq!(tag.user_id, owner.id);
        assert_eq!(tag.to_string(), "Vegan");
    }

    #[tokio::test]
    async fn test_create_tag_empty_name_fails() {
        let (service, owner, _) = setup_test_service().await;

        let result = service.create(&owner, input("   ")).await;

        assert!(matches!(result, Err(TagServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_list_tags_limited_to_user() {
        let (service, owner, other) = setup_test_service().await;
        service.create(&other, input("Fruity")).await.expect("create");
        service.create(&owner, input("Dessert")).await.expect("create");
        service.create(&owner, input("Vegan")).await.expect("create");

        let tags = service.list(&owner).await.expect("Failed to list tags");

        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[tokio::test]
    async fn test_update_tag() {
        let (service, owner, _) = setup_test_service().await;
        let tag = service.create(&owner, input("After Dinner")).await.expect("create");

        let updated = service
            .update(&owner, tag.id, input("Dessert"), true)
            .await
            .expect("Failed to update tag");

        assert_eq!(updated.name, "Dessert");
    }

    #[tokio::test]
    async fn test_update_other_users_tag_not_found() {
        let (service, owner, other) = setup_test_service().await;
        let tag = service.create(&other, input("Mine")).await.expect("create");

        let result = service.update(&owner, tag.id, input("Stolen"), true).await;

        assert!(matches!(result, Err(TagServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_tag() {
        let (service, owner, _) = setup_test_service().await;
        let tag = service.create(&owner, input("Breakfast")).await.expect("create");

        service.delete(&owner, tag.id).await.expect("Failed to delete tag");

        assert!(service.list(&owner).await.expect("list").is_empty());
        assert!(matches!(
            service.delete(&owner, tag.id).await,
            Err(TagServiceError::NotFound(_))
        ));
    }
}
