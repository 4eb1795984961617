//! Blog post repository (read-only)

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Post;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// All posts, most recently published first
    async fn list(&self) -> Result<Vec<Post>>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const LIST_POSTS: &str = r#"
    SELECT id, title, body, author, published_at
    FROM posts
    ORDER BY published_at DESC, id DESC
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn list(&self) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(LIST_POSTS)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list posts")?;
                rows.iter()
                    .map(|row| -> Result<Post> {
                        Ok(Post {
                            id: row.try_get("id")?,
                            title: row.try_get("title")?,
                            body: row.try_get("body")?,
                            author: row.try_get("author")?,
                            published_at: row.try_get("published_at")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(LIST_POSTS)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list posts")?;
                rows.iter()
                    .map(|row| -> Result<Post> {
                        Ok(Post {
                            id: row.try_get("id")?,
                            title: row.try_get("title")?,
                            body: row.try_get("body")?,
                            author: row.try_get("author")?,
                            published_at: row.try_get("published_at")?,
                        })
                    })
                    .collect()
            }
        }
    }
}
