use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::Recipe,
    services::catalog::CatalogClient,
};

/// In-memory catalog for tests and offline runs
///
/// Supports an artificial latency and a failure switch, and counts calls
/// so tests can assert a lookup never happened.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    recipes: Vec<Recipe>,
    latency: Option<Duration>,
    failing: bool,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCatalog {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes,
            ..Self::default()
        }
    }

    /// A catalog whose every lookup fails like an unreachable upstream
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of lookups served so far, failures included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve<F>(&self, predicate: F) -> AppResult<Vec<Recipe>>
    where
        F: Fn(&Recipe) -> bool,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing {
            return Err(AppError::ExternalApi(
                "Catalog API returned status 503 Service Unavailable".to_string(),
            ));
        }

        // Popularity is never the catalog's business
        Ok(self
            .recipes
            .iter()
            .filter(|r| predicate(r))
            .map(|r| Recipe {
                views: 0,
                saves: 0,
                average_rating: 0.0,
                ..r.clone()
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<Recipe>> {
        let needle = query.to_lowercase();
        self.serve(|r| r.title.to_lowercase().contains(&needle)).await
    }

    async fn by_category(&self, category: &str) -> AppResult<Vec<Recipe>> {
        self.serve(|r| {
            r.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
        })
        .await
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let recipes = self.serve(|_| true).await?;
        let mut seen = HashSet::new();
        Ok(recipes
            .into_iter()
            .filter_map(|r| r.category)
            .filter(|c| seen.insert(c.clone()))
            .collect())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            Recipe::new("1", "Pasta Carbonara").with_category("Italian"),
            Recipe::new("2", "Coq au Vin").with_category("French"),
            Recipe::new("3", "Pasta Primavera").with_category("Italian"),
        ])
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let results = catalog().search("PASTA").await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.recipe_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_by_category_and_call_count() {
        let catalog = catalog();
        let results = catalog.by_category("french").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_results_have_zeroed_popularity() {
        let mut popular = Recipe::new("9", "Tiramisu").with_category("Italian");
        popular.views = 500;
        let catalog = InMemoryCatalog::new(vec![popular]);

        let results = catalog.search("tiramisu").await.unwrap();
        assert_eq!(results[0].views, 0);
    }

    #[tokio::test]
    async fn test_failing_catalog() {
        let catalog = InMemoryCatalog::failing();
        assert!(catalog.search("pasta").await.is_err());
        assert!(catalog.list_categories().await.is_err());
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_list_categories_dedupes_in_first_seen_order() {
        let categories = catalog().list_categories().await.unwrap();
        assert_eq!(categories, vec!["Italian", "French"]);
    }
}
