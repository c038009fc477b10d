use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Counter, Recipe},
    routes::AppState,
};

async fn require_user(state: &AppState, username: &str) -> AppResult<()> {
    match state.store.find_user(username).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("User {} does not exist", username))),
    }
}

/// Adds a recipe to the user's saved collection
///
/// A first save bumps the recipe's save counter; saving again is a no-op.
pub async fn save_recipe(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(recipe): Json<Recipe>,
) -> AppResult<StatusCode> {
    require_user(&state, &username).await?;

    if recipe.recipe_id.trim().is_empty() {
        return Err(AppError::InvalidInput("recipeId cannot be empty".to_string()));
    }

    if state.store.save_recipe(&username, &recipe).await? {
        state.counters.record(&recipe.recipe_id, Counter::Saves);
        tracing::info!(username = %username, recipe_id = %recipe.recipe_id, "Recipe saved");
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::OK)
    }
}

/// Removes a recipe from the user's saved collection
pub async fn remove_saved_recipe(
    State(state): State<AppState>,
    Path((username, recipe_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    require_user(&state, &username).await?;

    if state.store.remove_saved_recipe(&username, &recipe_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Recipe {} is not saved by {}",
            recipe_id, username
        )))
    }
}
