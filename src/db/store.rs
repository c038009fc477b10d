use crate::{
    error::AppResult,
    models::{Counter, Recipe, SavedRecipe, User},
};

/// Mutable per-deployment document store
///
/// Holds recipe documents, users and their saved recipes, and the popularity
/// counters that only exist on this side. Implemented over Postgres + Redis for
/// deployments and in memory for tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of a recipe document
    async fn get_recipe(&self, recipe_id: &str) -> AppResult<Option<Recipe>>;

    /// Inserts or replaces a recipe document
    async fn put_recipe(&self, recipe: &Recipe) -> AppResult<()>;

    /// Published recipes whose category equals `category`
    async fn query_by_category(&self, category: &str) -> AppResult<Vec<Recipe>>;

    /// Published recipes whose title contains `text`, case-insensitively
    async fn query_by_title(&self, text: &str) -> AppResult<Vec<Recipe>>;

    /// Recipes written by `author`, any status
    async fn query_by_author(&self, author: &str) -> AppResult<Vec<Recipe>>;

    /// Distinct categories of published recipes
    async fn list_categories(&self) -> AppResult<Vec<String>>;

    /// View counter; `None` when no popularity document exists
    async fn views(&self, recipe_id: &str) -> AppResult<Option<u64>>;

    /// Save counter; `None` when no popularity document exists
    async fn saves(&self, recipe_id: &str) -> AppResult<Option<u64>>;

    /// Stored average rating; `None` when no popularity document exists
    async fn average_rating(&self, recipe_id: &str) -> AppResult<Option<f64>>;

    /// Atomically increments a counter, initializing it at 1 when absent
    async fn increment(&self, recipe_id: &str, counter: Counter) -> AppResult<u64>;

    async fn set_average_rating(&self, recipe_id: &str, rating: f64) -> AppResult<()>;

    /// Records (or replaces) a user's rating and returns every rating the recipe now has
    async fn record_rating(&self, recipe_id: &str, username: &str, rating: u8)
        -> AppResult<Vec<u8>>;

    async fn find_user(&self, username: &str) -> AppResult<Option<User>>;

    /// Saved-recipe snapshots for a user, oldest first; entries whose
    /// snapshot was cleared come back as `None`
    async fn saved_recipes(&self, username: &str) -> AppResult<Vec<Option<SavedRecipe>>>;

    /// Saves a recipe snapshot; returns false when it was already saved
    async fn save_recipe(&self, username: &str, recipe: &Recipe) -> AppResult<bool>;

    /// Returns false when nothing was saved under that id
    async fn remove_saved_recipe(&self, username: &str, recipe_id: &str) -> AppResult<bool>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
