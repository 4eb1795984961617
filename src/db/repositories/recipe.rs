//! Recipe repository
//!
//! Every query is scoped by owner: a recipe that belongs to someone else is
//! indistinguishable from one that does not exist.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Price, Recipe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// All recipes of a user, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Recipe>>;

    /// A single recipe, only if owned by `user_id`
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Recipe>>;

    /// Create a new recipe
    async fn create(&self, recipe: &Recipe) -> Result<Recipe>;

    /// Overwrite the editable fields of an existing recipe
    async fn update(&self, recipe: &Recipe) -> Result<Recipe>;

    /// Delete a recipe owned by `user_id`; returns whether a row was removed
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recipes_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => list_recipes_mysql(self.pool.mysql()?, user_id).await,
        }
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_recipe_sqlite(self.pool.sqlite()?, id, user_id).await,
            DatabaseDriver::Mysql => get_recipe_mysql(self.pool.mysql()?, id, user_id).await,
        }
    }

    async fn create(&self, recipe: &Recipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_recipe_sqlite(self.pool.sqlite()?, recipe).await,
            DatabaseDriver::Mysql => create_recipe_mysql(self.pool.mysql()?, recipe).await,
        }
    }

    async fn update(&self, recipe: &Recipe) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_recipe_sqlite(self.pool.sqlite()?, recipe).await,
            DatabaseDriver::Mysql => update_recipe_mysql(self.pool.mysql()?, recipe).await,
        }
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool> {
        let sql = "DELETE FROM recipes WHERE id = ? AND user_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete recipe")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price_cents, link, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_recipes_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Recipe>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE user_id = ? ORDER BY id DESC",
        RECIPE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list recipes")?;

    rows.iter().map(row_to_recipe_sqlite).collect()
}

async fn get_recipe_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE id = ? AND user_id = ?",
        RECIPE_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get recipe")?;

    row.as_ref().map(row_to_recipe_sqlite).transpose()
}

async fn create_recipe_sqlite(pool: &SqlitePool, recipe: &Recipe) -> Result<Recipe> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.link)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create recipe")?;

    Ok(Recipe {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..recipe.clone()
    })
}

async fn update_recipe_sqlite(pool: &SqlitePool, recipe: &Recipe) -> Result<Recipe> {
    sqlx::query(
        r#"
        UPDATE recipes
        SET title = ?, description = ?, time_minutes = ?, price_cents = ?, link = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.link)
    .bind(Utc::now())
    .bind(recipe.id)
    .bind(recipe.user_id)
    .execute(pool)
    .await
    .context("Failed to update recipe")?;

    get_recipe_sqlite(pool, recipe.id, recipe.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Recipe> {
    let cents: i64 = row.try_get("price_cents")?;
    Ok(Recipe {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        time_minutes: row.try_get("time_minutes")?,
        price: Price::from_cents(cents)
            .with_context(|| format!("Invalid price in database: {}", cents))?,
        link: row.try_get("link")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_recipes_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Recipe>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE user_id = ? ORDER BY id DESC",
        RECIPE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list recipes")?;

    rows.iter().map(row_to_recipe_mysql).collect()
}

async fn get_recipe_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE id = ? AND user_id = ?",
        RECIPE_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get recipe")?;

    row.as_ref().map(row_to_recipe_mysql).transpose()
}

async fn create_recipe_mysql(pool: &MySqlPool, recipe: &Recipe) -> Result<Recipe> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.link)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create recipe")?;

    Ok(Recipe {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..recipe.clone()
    })
}

async fn update_recipe_mysql(pool: &MySqlPool, recipe: &Recipe) -> Result<Recipe> {
    sqlx::query(
        r#"
        UPDATE recipes
        SET title = ?, description = ?, time_minutes = ?, price_cents = ?, link = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.link)
    .bind(Utc::now())
    .bind(recipe.id)
    .bind(recipe.user_id)
    .execute(pool)
    .await
    .context("Failed to update recipe")?;

    get_recipe_mysql(pool, recipe.id, recipe.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after update"))
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Recipe> {
    let cents: i64 = row.try_get("price_cents")?;
    Ok(Recipe {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        time_minutes: row.try_get("time_minutes")?,
        price: Price::from_cents(cents)
            .with_context(|| format!("Invalid price in database: {}", cents))?,
        link: row.try_get("link")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
