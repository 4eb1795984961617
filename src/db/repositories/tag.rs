//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get a tag by ID, only if owned by `user_id`
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Tag>>;

    /// All tags of a user, ordered by name descending
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Tag>>;

    /// Overwrite name and description
    async fn update(&self, tag: &Tag) -> Result<Tag>;

    /// Delete a tag owned by `user_id`; returns whether a row was removed
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite()?, tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql()?, tag).await,
        }
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_sqlite(self.pool.sqlite()?, id, user_id).await,
            DatabaseDriver::Mysql => get_tag_mysql(self.pool.mysql()?, id, user_id).await,
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.mysql()?, user_id).await,
        }
    }

    async fn update(&self, tag: &Tag) -> Result<Tag> {
        let sql = "UPDATE tags SET name = ?, description = ? WHERE id = ? AND user_id = ?";
        let updated = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(&tag.description)
                    .bind(tag.id)
                    .bind(tag.user_id)
                    .execute(pool)
                    .await
                    .context("Failed to update tag")?;
                get_tag_sqlite(pool, tag.id, tag.user_id).await?
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(&tag.description)
                    .bind(tag.id)
                    .bind(tag.user_id)
                    .execute(pool)
                    .await
                    .context("Failed to update tag")?;
                get_tag_mysql(pool, tag.id, tag.user_id).await?
            }
        };
        updated.ok_or_else(|| anyhow::anyhow!("Tag not found after update"))
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool> {
        let sql = "DELETE FROM tags WHERE id = ? AND user_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO tags (user_id, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(tag.user_id)
    .bind(&tag.name)
    .bind(&tag.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        user_id: tag.user_id,
        name: tag.name.clone(),
        description: tag.description.clone(),
        created_at: now,
    })
}

async fn get_tag_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, user_id, name, description, created_at FROM tags WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn list_tags_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, name, description, created_at
        FROM tags
        WHERE user_id = ?
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO tags (user_id, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(tag.user_id)
    .bind(&tag.name)
    .bind(&tag.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        user_id: tag.user_id,
        name: tag.name.clone(),
        description: tag.description.clone(),
        created_at: now,
    })
}

async fn get_tag_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, user_id, name, description, created_at FROM tags WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn list_tags_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, name, description, created_at
        FROM tags
        WHERE user_id = ?
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}
