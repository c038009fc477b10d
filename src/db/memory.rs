use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::{
    db::DocumentStore,
    error::{AppError, AppResult},
    models::{Counter, Metric, Recipe, RecipeStatus, SavedRecipe, User},
};

/// In-memory document store for tests and local runs
///
/// Metric reads can be made to fail per recipe and per field to exercise
/// partial-failure handling; `fail_queries` makes recipe queries fail and
/// `with_query_latency` slows them down.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<InMemoryInner>>,
    query_latency: Option<Duration>,
    queries_served: Arc<AtomicUsize>,
}

#[derive(Default)]
struct InMemoryInner {
    recipes: Vec<Recipe>,
    counts: HashMap<(String, Metric), u64>,
    ratings: HashMap<String, f64>,
    rating_votes: HashMap<String, Vec<(String, u8)>>,
    users: HashMap<String, User>,
    saved: HashMap<String, Vec<(String, Option<SavedRecipe>)>>,
    failing_reads: HashSet<(String, Metric)>,
    fail_queries: bool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_recipe(&self, recipe: Recipe) {
        let mut inner = self.inner.write().await;
        inner.recipes.retain(|r| r.recipe_id != recipe.recipe_id);
        inner.recipes.push(recipe);
    }

    /// Seeds the popularity document of a recipe
    pub async fn set_metrics(&self, recipe_id: &str, views: u64, saves: u64, rating: f64) {
        let mut inner = self.inner.write().await;
        inner
            .counts
            .insert((recipe_id.to_string(), Metric::Views), views);
        inner
            .counts
            .insert((recipe_id.to_string(), Metric::Saves), saves);
        inner.ratings.insert(recipe_id.to_string(), rating);
    }

    pub async fn insert_user(&self, user: User) {
        let mut inner = self.inner.write().await;
        inner.saved.entry(user.username.clone()).or_default();
        inner.users.insert(user.username.clone(), user);
    }

    /// Appends a raw saved entry, including `None` or malformed snapshots
    pub async fn push_saved(&self, username: &str, recipe_id: &str, entry: Option<SavedRecipe>) {
        let mut inner = self.inner.write().await;
        inner
            .saved
            .entry(username.to_string())
            .or_default()
            .push((recipe_id.to_string(), entry));
    }

    /// Makes every read of `metric` for `recipe_id` fail
    pub async fn fail_metric(&self, recipe_id: &str, metric: Metric) {
        let mut inner = self.inner.write().await;
        inner
            .failing_reads
            .insert((recipe_id.to_string(), metric));
    }

    pub async fn fail_queries(&self, fail: bool) {
        self.inner.write().await.fail_queries = fail;
    }

    /// Delays every recipe query by `latency`
    pub fn with_query_latency(mut self, latency: Duration) -> Self {
        self.query_latency = Some(latency);
        self
    }

    /// Recipe queries that ran to completion, failures included
    pub fn queries_served(&self) -> usize {
        self.queries_served.load(Ordering::SeqCst)
    }

    async fn check_read(&self, recipe_id: &str, metric: Metric) -> AppResult<()> {
        let inner = self.inner.read().await;
        if inner
            .failing_reads
            .contains(&(recipe_id.to_string(), metric))
        {
            return Err(AppError::Internal(format!(
                "{} read failed for recipe {}",
                metric, recipe_id
            )));
        }
        Ok(())
    }

    async fn query<F>(&self, predicate: F) -> AppResult<Vec<Recipe>>
    where
        F: Fn(&Recipe) -> bool,
    {
        if let Some(latency) = self.query_latency {
            tokio::time::sleep(latency).await;
        }
        self.queries_served.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().await;
        if inner.fail_queries {
            return Err(AppError::Internal("Document store unavailable".to_string()));
        }
        Ok(inner
            .recipes
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_recipe(&self, recipe_id: &str) -> AppResult<Option<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner
            .recipes
            .iter()
            .find(|r| r.recipe_id == recipe_id)
            .cloned())
    }

    async fn put_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        self.insert_recipe(recipe.clone()).await;
        Ok(())
    }

    async fn query_by_category(&self, category: &str) -> AppResult<Vec<Recipe>> {
        self.query(|r| {
            r.status == RecipeStatus::Published && r.category.as_deref() == Some(category)
        })
        .await
    }

    async fn query_by_title(&self, text: &str) -> AppResult<Vec<Recipe>> {
        let needle = text.to_lowercase();
        self.query(|r| {
            r.status == RecipeStatus::Published && r.title.to_lowercase().contains(&needle)
        })
        .await
    }

    async fn query_by_author(&self, author: &str) -> AppResult<Vec<Recipe>> {
        self.query(|r| r.author.as_deref() == Some(author)).await
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let published = self.query(|r| r.status == RecipeStatus::Published).await?;
        let mut seen = HashSet::new();
        Ok(published
            .into_iter()
            .filter_map(|r| r.category)
            .filter(|c| !c.trim().is_empty())
            .filter(|c| seen.insert(c.clone()))
            .collect())
    }

    async fn views(&self, recipe_id: &str) -> AppResult<Option<u64>> {
        self.check_read(recipe_id, Metric::Views).await?;
        let inner = self.inner.read().await;
        Ok(inner
            .counts
            .get(&(recipe_id.to_string(), Metric::Views))
            .copied())
    }

    async fn saves(&self, recipe_id: &str) -> AppResult<Option<u64>> {
        self.check_read(recipe_id, Metric::Saves).await?;
        let inner = self.inner.read().await;
        Ok(inner
            .counts
            .get(&(recipe_id.to_string(), Metric::Saves))
            .copied())
    }

    async fn average_rating(&self, recipe_id: &str) -> AppResult<Option<f64>> {
        self.check_read(recipe_id, Metric::AverageRating).await?;
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(recipe_id).copied())
    }

    async fn increment(&self, recipe_id: &str, counter: Counter) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let value = inner
            .counts
            .entry((recipe_id.to_string(), counter.into()))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn set_average_rating(&self, recipe_id: &str, rating: f64) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.ratings.insert(recipe_id.to_string(), rating);
        Ok(())
    }

    async fn record_rating(
        &self,
        recipe_id: &str,
        username: &str,
        rating: u8,
    ) -> AppResult<Vec<u8>> {
        let mut inner = self.inner.write().await;
        let votes = inner.rating_votes.entry(recipe_id.to_string()).or_default();
        votes.retain(|(voter, _)| voter != username);
        votes.push((username.to_string(), rating));
        Ok(votes.iter().map(|(_, r)| *r).collect())
    }

    async fn find_user(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(username).cloned())
    }

    async fn saved_recipes(&self, username: &str) -> AppResult<Vec<Option<SavedRecipe>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .saved
            .get(username)
            .map(|entries| entries.iter().map(|(_, entry)| entry.clone()).collect())
            .unwrap_or_default())
    }

    async fn save_recipe(&self, username: &str, recipe: &Recipe) -> AppResult<bool> {
        let snapshot = SavedRecipe::from_recipe(recipe)?;
        let mut inner = self.inner.write().await;
        let entries = inner.saved.entry(username.to_string()).or_default();
        if entries.iter().any(|(id, _)| *id == recipe.recipe_id) {
            return Ok(false);
        }
        entries.push((recipe.recipe_id.clone(), Some(snapshot)));
        Ok(true)
    }

    async fn remove_saved_recipe(&self, username: &str, recipe_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(entries) = inner.saved.get_mut(username) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(id, _)| id != recipe_id);
        Ok(entries.len() != before)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
