use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Counter, PopularityMetrics, Recipe},
    routes::AppState,
    services::{popularity, ratings},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: Option<String>,
}

/// A recipe with its popularity classification
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub display_title: String,
    pub popular: bool,
    pub engagement_rate: f64,
}

impl From<Recipe> for RecipeView {
    fn from(recipe: Recipe) -> Self {
        Self {
            display_title: popularity::display_title(&recipe),
            popular: popularity::is_popular(Some(&recipe)),
            engagement_rate: popularity::engagement_rate(&recipe),
            recipe,
        }
    }
}

/// Handler for recipe search endpoint
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<RecipeView>>> {
    tracing::info!(
        request_id = %request_id,
        name = %params.name,
        category = ?params.category,
        "Processing search request"
    );

    let recipes = state
        .aggregator
        .search(&params.name, params.category.as_deref())
        .await?;

    Ok(Json(recipes.into_iter().map(RecipeView::from).collect()))
}

/// Handler for the combined category vocabulary
pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let categories = state.aggregator.list_categories().await?;
    Ok(Json(categories))
}

/// Handler for a single document-store recipe, enriched
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> AppResult<Json<RecipeView>> {
    let recipe = state
        .store
        .get_recipe(&recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", recipe_id)))?;

    let enriched = state.enricher.enrich(vec![recipe]).await;
    let recipe = enriched
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("Enrichment dropped the recipe".to_string()))?;

    Ok(Json(RecipeView::from(recipe)))
}

/// Handler for a recipe's raw popularity metrics
pub async fn metrics(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Json<PopularityMetrics> {
    Json(state.enricher.metrics_for(&recipe_id).await)
}

/// Records a view without waiting for the counter write
pub async fn record_view(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> StatusCode {
    state.counters.record(&recipe_id, Counter::Views);
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub username: String,
    pub rating: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub recipe_id: String,
    pub average_rating: f64,
}

/// Handler for rating a recipe
pub async fn rate(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<RatingResponse>> {
    let average_rating =
        ratings::rate_recipe(state.store.as_ref(), &recipe_id, &request.username, request.rating)
            .await?;

    Ok(Json(RatingResponse {
        recipe_id,
        average_rating,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_view_flattens_recipe() {
        let mut recipe = Recipe::new("1", "Pasta");
        recipe.views = 100;
        recipe.saves = 10;
        recipe.average_rating = 4.5;

        let json = serde_json::to_value(RecipeView::from(recipe)).unwrap();
        assert_eq!(json["recipeId"], "1");
        assert_eq!(json["title"], "Pasta");
        assert_eq!(json["displayTitle"], "🔥 Pasta");
        assert_eq!(json["popular"], true);
        assert_eq!(json["engagementRate"], 0.1);
    }
}
