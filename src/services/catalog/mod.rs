/// Recipe catalog abstraction
///
/// The catalog is the public, read-only source of descriptive recipe data. It
/// knows nothing about popularity: every recipe it returns has zeroed counters.
use crate::{error::AppResult, models::Recipe};

pub mod mealdb;
pub mod memory;

pub use mealdb::MealDbCatalog;
pub use memory::InMemoryCatalog;

/// Trait for recipe catalogs
///
/// An empty list is a successful lookup with no matches. Transport failures,
/// non-success statuses and malformed payloads are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Free-text search over recipe names
    async fn search(&self, query: &str) -> AppResult<Vec<Recipe>>;

    /// All recipes in a category
    async fn by_category(&self, category: &str) -> AppResult<Vec<Recipe>>;

    /// The catalog's category vocabulary
    async fn list_categories(&self) -> AppResult<Vec<String>>;

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
