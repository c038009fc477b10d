/// TheMealDB catalog client
///
/// Endpoints used:
/// 1. Search: /search.php?s={query} → full meal records
/// 2. Category: /filter.php?c={category} → id, name and thumbnail only
/// 3. Categories: /list.php?c=list → category names
///
/// Every endpoint wraps its results in `{"meals": [...]}`, with `null` for no matches.
use crate::{
    error::{AppError, AppResult},
    models::{MealDbCategory, MealDbMeal, MealDbResponse, Recipe},
    services::catalog::CatalogClient,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct MealDbCatalog {
    http_client: HttpClient,
    api_url: String,
}

impl MealDbCatalog {
    /// Creates a catalog client with a per-request timeout
    pub fn new(api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Performs a GET and unwraps the `meals` envelope
    async fn get_meals<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Vec<T>> {
        let url = format!("{}/{}", self.api_url, endpoint);

        let response = self.http_client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                endpoint = %endpoint,
                status = %status,
                body = %body,
                "Catalog request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        tracing::debug!(endpoint = %endpoint, response = %response_text, "Raw catalog response");

        let envelope: MealDbResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                endpoint = %endpoint,
                "Failed to deserialize catalog response"
            );
            AppError::ExternalApi(format!("Failed to parse catalog response: {}", e))
        })?;

        Ok(envelope.meals.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl CatalogClient for MealDbCatalog {
    async fn search(&self, query: &str) -> AppResult<Vec<Recipe>> {
        let meals: Vec<MealDbMeal> = self.get_meals("search.php", &[("s", query)]).await?;
        let recipes: Vec<Recipe> = meals.into_iter().map(Recipe::from).collect();

        tracing::info!(
            query = %query,
            results = recipes.len(),
            catalog = "mealdb",
            "Catalog search completed"
        );

        Ok(recipes)
    }

    async fn by_category(&self, category: &str) -> AppResult<Vec<Recipe>> {
        let meals: Vec<MealDbMeal> = self.get_meals("filter.php", &[("c", category)]).await?;

        // Filter results omit the category column; it is the one we asked for
        let recipes: Vec<Recipe> = meals
            .into_iter()
            .map(Recipe::from)
            .map(|mut recipe| {
                if recipe.category.is_none() {
                    recipe.category = Some(category.to_string());
                }
                recipe
            })
            .collect();

        tracing::info!(
            category = %category,
            results = recipes.len(),
            catalog = "mealdb",
            "Catalog category lookup completed"
        );

        Ok(recipes)
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<MealDbCategory> =
            self.get_meals("list.php", &[("c", "list")]).await?;

        Ok(categories
            .into_iter()
            .map(|c| c.name.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect())
    }

    fn name(&self) -> &'static str {
        "mealdb"
    }
}
