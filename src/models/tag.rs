//! Tag model
//!
//! Tags are private to the user who created them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    /// Tag name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag owned by `user_id`.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(user_id: i64, name: String, description: String) -> Self {
        Self {
            id: 0,
            user_id,
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Input for creating or replacing a tag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new(3, "Vegan".to_string(), "Vegan food".to_string());

        assert_eq!(tag.id, 0);
        assert_eq!(tag.user_id, 3);
        assert_eq!(tag.name, "Vegan");
        assert_eq!(tag.description, "Vegan food");
    }

    #[test]
    fn test_tag_displays_as_name() {
        let tag = Tag::new(1, "Dessert".to_string(), String::new());
        assert_eq!(tag.to_string(), tag.name);
    }
}
