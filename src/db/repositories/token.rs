//! Auth token repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::AuthToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Look up a token by its key
    async fn get_by_key(&self, key: &str) -> Result<Option<AuthToken>>;

    /// Get the token belonging to a user, if one was issued
    async fn get_by_user(&self, user_id: i64) -> Result<Option<AuthToken>>;

    /// Store a freshly generated token
    async fn create(&self, token: &AuthToken) -> Result<AuthToken>;
}

/// SQLx-based token repository implementation
pub struct SqlxTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, column: &str, value: TokenLookup<'_>) -> Result<Option<AuthToken>> {
        let sql = format!(
            "SELECT token_key, user_id, created_at FROM auth_tokens WHERE {} = ?",
            column
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(&sql);
                let query = match value {
                    TokenLookup::Key(key) => query.bind(key),
                    TokenLookup::User(id) => query.bind(id),
                };
                let row = query
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get auth token")?;
                row.map(|row| -> Result<AuthToken> {
                    Ok(AuthToken {
                        key: row.try_get("token_key")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(&sql);
                let query = match value {
                    TokenLookup::Key(key) => query.bind(key),
                    TokenLookup::User(id) => query.bind(id),
                };
                let row = query
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get auth token")?;
                row.map(|row| -> Result<AuthToken> {
                    Ok(AuthToken {
                        key: row.try_get("token_key")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
        }
    }
}

enum TokenLookup<'a> {
    Key(&'a str),
    User(i64),
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<AuthToken>> {
        self.fetch_one_where("token_key", TokenLookup::Key(key)).await
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Option<AuthToken>> {
        self.fetch_one_where("user_id", TokenLookup::User(user_id)).await
    }

    async fn create(&self, token: &AuthToken) -> Result<AuthToken> {
        let sql = "INSERT INTO auth_tokens (token_key, user_id, created_at) VALUES (?, ?, ?)";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&token.key)
                    .bind(token.user_id)
                    .bind(token.created_at)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to create auth token")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&token.key)
                    .bind(token.user_id)
                    .bind(token.created_at)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to create auth token")?;
            }
        }
        Ok(token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::User;

    async fn setup() -> (SqlxTokenRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("token@example.com", String::new(), "hash".to_string()))
            .await
            .expect("Failed to create user");

        (SqlxTokenRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_and_lookup_token() {
        let (repo, user_id) = setup().await;
        let token = AuthToken::generate(user_id);

        repo.create(&token).await.expect("Failed to create token");

        let by_key = repo
            .get_by_key(&token.key)
            .await
            .expect("Failed to get token")
            .expect("Token not found");
        let by_user = repo
            .get_by_user(user_id)
            .await
            .expect("Failed to get token")
            .expect("Token not found");

        assert_eq!(by_key.user_id, user_id);
        assert_eq!(by_user.key, token.key);
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let (repo, _) = setup().await;

        let found = repo.get_by_key("deadbeef").await.expect("Failed to get token");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_one_token_per_user() {
        let (repo, user_id) = setup().await;

        repo.create(&AuthToken::generate(user_id))
            .await
            .expect("Failed to create token");
        let second = repo.create(&AuthToken::generate(user_id)).await;

        assert!(second.is_err(), "Should fail due to unique user_id");
    }
}
