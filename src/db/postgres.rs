use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{redis::CounterKey, DocumentStore, RedisCounters},
    error::AppResult,
    models::{Counter, Metric, Recipe, RecipeStatus, SavedRecipe, User},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const RECIPE_COLUMNS: &str = "recipe_id, title, description, category, tags, ingredients, \
                              image_url, author, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    recipe_id: String,
    title: String,
    description: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    ingredients: Vec<String>,
    image_url: Option<String>,
    author: Option<String>,
    status: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            recipe_id: row.recipe_id,
            title: row.title,
            description: row.description,
            category: row.category,
            tags: row.tags.into_iter().collect(),
            ingredients: row.ingredients,
            image_url: row.image_url,
            author: row.author,
            status: RecipeStatus::parse(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
            views: 0,
            saves: 0,
            average_rating: 0.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    username: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

/// Document store backed by Postgres (documents) and Redis (popularity counters)
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    counters: RedisCounters,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, counters: RedisCounters) -> Self {
        Self { pool, counters }
    }

    async fn fetch_recipes(&self, filter: &str, value: &str) -> AppResult<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes WHERE {} ORDER BY created_at DESC NULLS LAST, recipe_id",
            RECIPE_COLUMNS, filter
        );
        let rows: Vec<RecipeRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_recipe(&self, recipe_id: &str) -> AppResult<Option<Recipe>> {
        let sql = format!("SELECT {} FROM recipes WHERE recipe_id = $1", RECIPE_COLUMNS);
        let row: Option<RecipeRow> = sqlx::query_as(&sql)
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Recipe::from))
    }

    async fn put_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        let tags: Vec<String> = recipe.tags.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO recipes
                (recipe_id, title, description, category, tags, ingredients,
                 image_url, author, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, now()), now())
            ON CONFLICT (recipe_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                tags = EXCLUDED.tags,
                ingredients = EXCLUDED.ingredients,
                image_url = EXCLUDED.image_url,
                author = EXCLUDED.author,
                status = EXCLUDED.status,
                updated_at = now()
            "#,
        )
        .bind(&recipe.recipe_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.category)
        .bind(&tags)
        .bind(&recipe.ingredients)
        .bind(&recipe.image_url)
        .bind(&recipe.author)
        .bind(recipe.status.as_str())
        .bind(recipe.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(recipe_id = %recipe.recipe_id, "Recipe document written");

        Ok(())
    }

    async fn query_by_category(&self, category: &str) -> AppResult<Vec<Recipe>> {
        self.fetch_recipes("status = 'published' AND category = $1", category)
            .await
    }

    async fn query_by_title(&self, text: &str) -> AppResult<Vec<Recipe>> {
        self.fetch_recipes(
            "status = 'published' AND title ILIKE '%' || $1 || '%'",
            text,
        )
        .await
    }

    async fn query_by_author(&self, author: &str) -> AppResult<Vec<Recipe>> {
        self.fetch_recipes("author = $1", author).await
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category
            FROM recipes
            WHERE status = 'published' AND category IS NOT NULL AND btrim(category) <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn views(&self, recipe_id: &str) -> AppResult<Option<u64>> {
        self.counters
            .get_count(&CounterKey::new(recipe_id, Metric::Views))
            .await
    }

    async fn saves(&self, recipe_id: &str) -> AppResult<Option<u64>> {
        self.counters
            .get_count(&CounterKey::new(recipe_id, Metric::Saves))
            .await
    }

    async fn average_rating(&self, recipe_id: &str) -> AppResult<Option<f64>> {
        self.counters
            .get_rating(&CounterKey::new(recipe_id, Metric::AverageRating))
            .await
    }

    async fn increment(&self, recipe_id: &str, counter: Counter) -> AppResult<u64> {
        self.counters.increment(recipe_id, counter).await
    }

    async fn set_average_rating(&self, recipe_id: &str, rating: f64) -> AppResult<()> {
        self.counters.set_rating(recipe_id, rating).await
    }

    async fn record_rating(
        &self,
        recipe_id: &str,
        username: &str,
        rating: u8,
    ) -> AppResult<Vec<u8>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO recipe_ratings (recipe_id, username, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (recipe_id, username) DO UPDATE SET rating = EXCLUDED.rating
            "#,
        )
        .bind(recipe_id)
        .bind(username)
        .bind(i16::from(rating))
        .execute(&mut *tx)
        .await?;

        let ratings: Vec<i16> =
            sqlx::query_scalar("SELECT rating FROM recipe_ratings WHERE recipe_id = $1")
                .bind(recipe_id)
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(ratings
            .into_iter()
            .filter_map(|r| u8::try_from(r).ok())
            .collect())
    }

    async fn find_user(&self, username: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, display_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            username: row.username,
            display_name: row.display_name,
            created_at: Some(row.created_at),
        }))
    }

    async fn saved_recipes(&self, username: &str) -> AppResult<Vec<Option<SavedRecipe>>> {
        let snapshots: Vec<Option<serde_json::Value>> = sqlx::query_scalar(
            r#"
            SELECT recipe
            FROM saved_recipes
            WHERE username = $1
            ORDER BY saved_at, recipe_id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots
            .into_iter()
            .map(|snapshot| snapshot.filter(|v| !v.is_null()).map(SavedRecipe))
            .collect())
    }

    async fn save_recipe(&self, username: &str, recipe: &Recipe) -> AppResult<bool> {
        let snapshot = SavedRecipe::from_recipe(recipe)?;

        let result = sqlx::query(
            r#"
            INSERT INTO saved_recipes (username, recipe_id, recipe)
            VALUES ($1, $2, $3)
            ON CONFLICT (username, recipe_id) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(&recipe.recipe_id)
        .bind(&snapshot.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_saved_recipe(&self, username: &str, recipe_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM saved_recipes WHERE username = $1 AND recipe_id = $2")
            .bind(username)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn name(&self) -> &'static str {
        "postgres+redis"
    }
}
