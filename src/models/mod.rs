use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;

pub mod user;

pub use user::{SavedRecipe, User};

/// Lifecycle status of a recipe document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    Draft,
    #[default]
    Published,
}

impl RecipeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeStatus::Draft => "draft",
            RecipeStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "draft" => RecipeStatus::Draft,
            _ => RecipeStatus::Published,
        }
    }
}

/// A recipe as returned to the client, from either the catalog or the document store
///
/// `views`, `saves` and `average_rating` are derived state: they are authoritative
/// only in the document store and stay zeroed until enrichment fills them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub recipe_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RecipeStatus,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub saves: u64,
    #[serde(default)]
    pub average_rating: f64,
}

impl Recipe {
    /// Creates a published recipe with no popularity data
    pub fn new(recipe_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            title: title.into(),
            description: None,
            category: None,
            tags: BTreeSet::new(),
            ingredients: Vec::new(),
            image_url: None,
            author: None,
            created_at: None,
            updated_at: None,
            status: RecipeStatus::Published,
            views: 0,
            saves: 0,
            average_rating: 0.0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Snapshot of the popularity fields currently held by this recipe
    pub fn metrics(&self) -> PopularityMetrics {
        PopularityMetrics {
            recipe_id: self.recipe_id.clone(),
            views: self.views,
            saves: self.saves,
            average_rating: self.average_rating,
        }
    }
}

/// Popularity counters for one recipe, read from the document store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopularityMetrics {
    pub recipe_id: String,
    pub views: u64,
    pub saves: u64,
    pub average_rating: f64,
}

/// One independently readable popularity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Views,
    Saves,
    AverageRating,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Views, Metric::Saves, Metric::AverageRating];
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Views => write!(f, "views"),
            Metric::Saves => write!(f, "saves"),
            Metric::AverageRating => write!(f, "rating"),
        }
    }
}

/// Counters that support increment-or-initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Views,
    Saves,
}

impl From<Counter> for Metric {
    fn from(counter: Counter) -> Self {
        match counter {
            Counter::Views => Metric::Views,
            Counter::Saves => Metric::Saves,
        }
    }
}

/// Recomputes an average rating from the individual ratings a recipe has received
///
/// Callers invoke this explicitly after recording a rating; an unrated recipe averages 0.0.
pub fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let total: u64 = ratings.iter().map(|r| u64::from(*r)).sum();
    total as f64 / ratings.len() as f64
}

// ============================================================================
// Catalog (TheMealDB) API Types
// ============================================================================

/// Envelope used by every catalog endpoint; `meals` is null when nothing matched
#[derive(Debug, Deserialize)]
pub struct MealDbResponse<T> {
    pub meals: Option<Vec<T>>,
}

/// Raw meal record from the catalog
///
/// Search responses carry the full record, category filters only id, name and thumbnail.
#[derive(Debug, Clone, Deserialize)]
pub struct MealDbMeal {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strCategory", default)]
    pub category: Option<String>,
    #[serde(rename = "strArea", default)]
    pub area: Option<String>,
    #[serde(rename = "strInstructions", default)]
    pub instructions: Option<String>,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "strTags", default)]
    pub tags: Option<String>,
    /// Numbered `strIngredientN` / `strMeasureN` columns
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MealDbMeal {
    /// Collects the numbered ingredient columns in order, prefixed by their measure
    fn ingredients(&self) -> Vec<String> {
        (1..=20)
            .filter_map(|n| {
                let ingredient = self
                    .extra
                    .get(&format!("strIngredient{}", n))
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())?;
                let measure = self
                    .extra
                    .get(&format!("strMeasure{}", n))
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .unwrap_or_default();
                if measure.is_empty() {
                    Some(ingredient.to_string())
                } else {
                    Some(format!("{} {}", measure, ingredient))
                }
            })
            .collect()
    }
}

impl From<MealDbMeal> for Recipe {
    fn from(meal: MealDbMeal) -> Self {
        let ingredients = meal.ingredients();

        let mut tags: BTreeSet<String> = meal
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(area) = meal.area.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            tags.insert(area.to_string());
        }

        Recipe {
            recipe_id: meal.id,
            title: meal.name,
            description: meal.instructions.filter(|s| !s.trim().is_empty()),
            category: meal.category.filter(|s| !s.trim().is_empty()),
            tags,
            ingredients,
            image_url: meal.thumbnail,
            ..Recipe::new(String::new(), String::new())
        }
    }
}

/// Category entry from `/list.php?c=list`
#[derive(Debug, Clone, Deserialize)]
pub struct MealDbCategory {
    #[serde(rename = "strCategory")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_starts_with_zeroed_popularity() {
        let recipe = Recipe::new("1", "Pasta");
        assert_eq!(recipe.views, 0);
        assert_eq!(recipe.saves, 0);
        assert_eq!(recipe.average_rating, 0.0);
        assert_eq!(recipe.status, RecipeStatus::Published);
    }

    #[test]
    fn test_recipe_deserializes_with_missing_popularity_fields() {
        let json = r#"{"recipeId":"7","title":"Ratatouille","category":"French"}"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.recipe_id, "7");
        assert_eq!(recipe.category.as_deref(), Some("French"));
        assert_eq!(recipe.views, 0);
        assert!(recipe.tags.is_empty());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RecipeStatus::Draft).unwrap(),
            "\"draft\""
        );
        assert_eq!(RecipeStatus::parse("draft"), RecipeStatus::Draft);
        assert_eq!(RecipeStatus::parse("published"), RecipeStatus::Published);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5, 4]), 4.5);
        assert_eq!(average_rating(&[1, 2, 3]), 2.0);
    }

    #[test]
    fn test_meal_to_recipe_full_record() {
        let json = r#"{
            "idMeal": "52771",
            "strMeal": "Spicy Arrabiata Penne",
            "strCategory": "Vegetarian",
            "strArea": "Italian",
            "strInstructions": "Bring a large pot of water to a boil.",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/ustsqw1468250014.jpg",
            "strTags": "Pasta,Curry",
            "strIngredient1": "penne rigate",
            "strMeasure1": "1 pound",
            "strIngredient2": "olive oil",
            "strMeasure2": "1/4 cup",
            "strIngredient3": "",
            "strMeasure3": " ",
            "strIngredient4": null
        }"#;

        let meal: MealDbMeal = serde_json::from_str(json).unwrap();
        let recipe: Recipe = meal.into();

        assert_eq!(recipe.recipe_id, "52771");
        assert_eq!(recipe.title, "Spicy Arrabiata Penne");
        assert_eq!(recipe.category.as_deref(), Some("Vegetarian"));
        assert_eq!(
            recipe.ingredients,
            vec!["1 pound penne rigate", "1/4 cup olive oil"]
        );
        assert!(recipe.tags.contains("Pasta"));
        assert!(recipe.tags.contains("Curry"));
        assert!(recipe.tags.contains("Italian"));
        assert_eq!(recipe.views, 0);
    }

    #[test]
    fn test_meal_to_recipe_filter_record() {
        let json = r#"{
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg"
        }"#;

        let meal: MealDbMeal = serde_json::from_str(json).unwrap();
        let recipe: Recipe = meal.into();
        assert_eq!(recipe.recipe_id, "52772");
        assert_eq!(recipe.category, None);
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.description.is_none());
    }

    #[test]
    fn test_null_meals_envelope() {
        let response: MealDbResponse<MealDbMeal> =
            serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(response.meals.is_none());
    }
}
