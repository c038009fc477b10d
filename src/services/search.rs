use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::DocumentStore,
    error::{AppError, AppResult},
    models::Recipe,
    services::{catalog::CatalogClient, enrichment::PopularityEnricher},
};

/// Merges two result lists, keeping the first copy of each recipe id
///
/// `primary` entries precede `secondary` ones, so on an id collision the primary
/// (catalog) copy's descriptive fields win.
pub fn merge_by_id(primary: Vec<Recipe>, secondary: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|recipe| seen.insert(recipe.recipe_id.clone()))
        .collect()
}

fn title_matches(recipe: &Recipe, needle: &str) -> bool {
    recipe.title.to_lowercase().contains(needle)
}

/// Searches the catalog and the document store together
///
/// Either source failing fails the whole call. Only per-recipe metric reads are
/// allowed to fail quietly, inside the enricher.
pub struct SearchAggregator {
    catalog: Arc<dyn CatalogClient>,
    store: Arc<dyn DocumentStore>,
    enricher: PopularityEnricher,
}

impl SearchAggregator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        store: Arc<dyn DocumentStore>,
        enricher: PopularityEnricher,
    ) -> Self {
        Self {
            catalog,
            store,
            enricher,
        }
    }

    /// Searches by name, or by category when one is given
    ///
    /// With a category, both sources are asked for the category and a non-empty
    /// name narrows the results by title. Without one, both are searched by name.
    #[instrument(skip(self))]
    pub async fn search(&self, name: &str, category: Option<&str>) -> AppResult<Vec<Recipe>> {
        let name = name.trim();
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        if name.is_empty() && category.is_none() {
            return Err(AppError::InvalidInput(
                "Provide a recipe name or a category".to_string(),
            ));
        }

        // Store lookup runs on its own task while the catalog call proceeds here
        let store = Arc::clone(&self.store);
        let store_filter = category.unwrap_or(name).to_string();
        let by_category = category.is_some();
        let store_lookup = tokio::spawn(async move {
            if by_category {
                store.query_by_category(&store_filter).await
            } else {
                store.query_by_title(&store_filter).await
            }
        });

        let catalog_result = match category {
            Some(category) => self.catalog.by_category(category).await,
            None => self.catalog.search(name).await,
        };

        let mut catalog_recipes = match catalog_result {
            Ok(recipes) => recipes,
            Err(e) => {
                store_lookup.abort();
                tracing::error!(
                    error = %e,
                    catalog = self.catalog.name(),
                    name = %name,
                    category = ?category,
                    "Catalog lookup failed, abandoning search"
                );
                return Err(e);
            }
        };

        let mut store_recipes = match store_lookup.await {
            Ok(Ok(recipes)) => recipes,
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    store = self.store.name(),
                    "Store lookup failed, abandoning search"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::error!(error = %e, "Store lookup task join error");
                return Err(AppError::Internal(format!("Store lookup task failed: {}", e)));
            }
        };

        if category.is_some() && !name.is_empty() {
            let needle = name.to_lowercase();
            catalog_recipes.retain(|r| title_matches(r, &needle));
            store_recipes.retain(|r| title_matches(r, &needle));
        }

        let catalog_count = catalog_recipes.len();
        let store_count = store_recipes.len();
        let merged = merge_by_id(catalog_recipes, store_recipes);

        tracing::info!(
            name = %name,
            category = ?category,
            catalog_results = catalog_count,
            store_results = store_count,
            merged = merged.len(),
            "Search sources merged"
        );

        Ok(self.enricher.enrich(merged).await)
    }

    /// Union of both sources' category vocabularies, first-seen order
    ///
    /// Catalog categories come first; like search, a failure of either source
    /// fails the listing.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> AppResult<Vec<String>> {
        let (catalog_categories, store_categories) =
            tokio::join!(self.catalog.list_categories(), self.store.list_categories());

        let catalog_categories = catalog_categories?;
        let store_categories = store_categories.inspect_err(|e| {
            tracing::error!(error = %e, store = self.store.name(), "Store category listing failed");
        })?;

        let mut seen = HashSet::new();
        Ok(catalog_categories
            .into_iter()
            .chain(store_categories)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .filter(|c| seen.insert(c.clone()))
            .collect())
    }
}
