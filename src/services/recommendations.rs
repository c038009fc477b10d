use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::{
    db::DocumentStore,
    error::{AppResult, RecommendationError},
    models::{Recipe, SavedRecipe},
    services::catalog::CatalogClient,
};

/// Recipes from the user's favorite category
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub category: String,
    pub recipes: Vec<Recipe>,
}

/// Counts saved recipes per category, most frequent first
///
/// Null entries, entries with a malformed category and blank categories are
/// skipped; categories are trimmed before counting. Equal counts keep the order
/// in which the categories were first encountered.
pub fn rank_categories(saved: &[Option<SavedRecipe>]) -> Vec<(String, usize)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut tally: Vec<(String, usize)> = Vec::new();

    for entry in saved.iter().flatten() {
        let category = match entry.category() {
            Ok(Some(category)) => category.trim(),
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping saved recipe with unreadable category");
                continue;
            }
        };
        if category.is_empty() {
            continue;
        }

        match positions.get(category) {
            Some(&index) => tally[index].1 += 1,
            None => {
                positions.insert(category.to_string(), tally.len());
                tally.push((category.to_string(), 1));
            }
        }
    }

    // Stable sort: ties stay in first-encounter order
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
}

/// Recommends catalog recipes from the category a user saves most
pub struct RecommendationRanker {
    catalog: Arc<dyn CatalogClient>,
    store: Arc<dyn DocumentStore>,
}

impl RecommendationRanker {
    pub fn new(catalog: Arc<dyn CatalogClient>, store: Arc<dyn DocumentStore>) -> Self {
        Self { catalog, store }
    }

    /// Checks, in order: the user exists, has favorites, has a usable favorite
    /// category, and that category has catalog recipes. Stops at the first miss.
    #[instrument(skip(self))]
    pub async fn recommend(&self, username: &str) -> AppResult<Recommendation> {
        let user = self
            .store
            .find_user(username)
            .await?
            .ok_or_else(|| RecommendationError::UserNotFound(username.to_string()))?;

        let saved = self.store.saved_recipes(&user.username).await?;
        if saved.is_empty() {
            return Err(RecommendationError::NoFavorites.into());
        }

        let ranked = rank_categories(&saved);
        let Some((category, count)) = ranked.first().cloned() else {
            return Err(RecommendationError::NoFavoriteCategory.into());
        };

        tracing::info!(
            username = %username,
            saved = saved.len(),
            categories = ranked.len(),
            favorite = %category,
            count = count,
            "Favorite category determined"
        );

        let recipes = self.catalog.by_category(&category).await?;
        if recipes.is_empty() {
            return Err(RecommendationError::NoRecommendations(category).into());
        }

        tracing::info!(
            username = %username,
            category = %category,
            results = recipes.len(),
            "Recommendations ready"
        );

        Ok(Recommendation { category, recipes })
    }
}
