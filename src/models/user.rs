use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::Recipe;

/// A registered user of the deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            created_at: None,
        }
    }
}

/// Snapshot of a recipe in a user's saved collection
///
/// Stored as a loose document: older snapshots may lack fields or carry
/// them with an unexpected type, so accessors are fallible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SavedRecipe(pub serde_json::Value);

impl SavedRecipe {
    pub fn from_recipe(recipe: &Recipe) -> AppResult<Self> {
        let mut snapshot = recipe.clone();
        snapshot.views = 0;
        snapshot.saves = 0;
        snapshot.average_rating = 0.0;
        serde_json::to_value(snapshot)
            .map(SavedRecipe)
            .map_err(|e| AppError::Internal(format!("Saved recipe serialization error: {}", e)))
    }

    pub fn recipe_id(&self) -> Option<&str> {
        self.0.get("recipeId").and_then(|v| v.as_str())
    }

    /// Category of the saved snapshot
    ///
    /// A missing or null category is `Ok(None)`; a category stored with a
    /// non-string type is an error.
    pub fn category(&self) -> AppResult<Option<&str>> {
        match self.0.get("category") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(category)) => Ok(Some(category.as_str())),
            Some(other) => Err(AppError::Internal(format!(
                "Saved recipe {} has malformed category: {}",
                self.recipe_id().unwrap_or("<unknown>"),
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_saved_recipe_from_recipe_drops_popularity() {
        let mut recipe = Recipe::new("9", "Paella").with_category("Spanish");
        recipe.views = 120;
        let saved = SavedRecipe::from_recipe(&recipe).unwrap();
        assert_eq!(saved.recipe_id(), Some("9"));
        assert_eq!(saved.category().unwrap(), Some("Spanish"));
        assert_eq!(saved.0["views"], 0);
    }

    #[test]
    fn test_saved_recipe_missing_category() {
        let saved = SavedRecipe(json!({ "recipeId": "1", "title": "Toast" }));
        assert_eq!(saved.category().unwrap(), None);

        let saved = SavedRecipe(json!({ "recipeId": "1", "category": null }));
        assert_eq!(saved.category().unwrap(), None);
    }

    #[test]
    fn test_saved_recipe_malformed_category() {
        let saved = SavedRecipe(json!({ "recipeId": "1", "category": ["Italian"] }));
        assert!(saved.category().is_err());
    }
}
