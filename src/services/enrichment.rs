use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::{
    db::DocumentStore,
    error::{AppError, AppResult},
    models::{Metric, PopularityMetrics, Recipe},
};

/// Result of one metric read; `None` means the store holds no document for it
#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Views(Option<u64>),
    Saves(Option<u64>),
    AverageRating(Option<f64>),
}

impl Reading {
    fn apply(self, recipe: &mut Recipe) {
        match self {
            Reading::Views(views) => recipe.views = views.unwrap_or(0),
            Reading::Saves(saves) => recipe.saves = saves.unwrap_or(0),
            Reading::AverageRating(rating) => recipe.average_rating = rating.unwrap_or(0.0),
        }
    }
}

async fn read_metric(store: &dyn DocumentStore, recipe_id: &str, metric: Metric) -> AppResult<Reading> {
    Ok(match metric {
        Metric::Views => Reading::Views(store.views(recipe_id).await?),
        Metric::Saves => Reading::Saves(store.saves(recipe_id).await?),
        Metric::AverageRating => Reading::AverageRating(store.average_rating(recipe_id).await?),
    })
}

/// Attaches document-store popularity metrics to recipes
///
/// Every metric of every recipe is read on its own task. A failed read only
/// costs that one field, which keeps whatever value it had before.
#[derive(Clone)]
pub struct PopularityEnricher {
    store: Arc<dyn DocumentStore>,
    permits: Arc<Semaphore>,
}

impl PopularityEnricher {
    /// `max_in_flight` bounds concurrent reads; it never changes which reads happen
    pub fn new(store: Arc<dyn DocumentStore>, max_in_flight: usize) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Returns the recipes, in input order, with views, saves and rating filled in
    #[instrument(skip_all, fields(recipes = recipes.len()))]
    pub async fn enrich(&self, mut recipes: Vec<Recipe>) -> Vec<Recipe> {
        if recipes.is_empty() {
            return recipes;
        }

        let mut reads: JoinSet<(usize, Metric, AppResult<Reading>)> = JoinSet::new();

        for (index, recipe) in recipes.iter().enumerate() {
            for metric in Metric::ALL {
                let store = Arc::clone(&self.store);
                let permits = Arc::clone(&self.permits);
                let recipe_id = recipe.recipe_id.clone();

                reads.spawn(async move {
                    let reading = match permits.acquire().await {
                        Ok(_permit) => read_metric(store.as_ref(), &recipe_id, metric).await,
                        Err(e) => Err(AppError::Internal(format!("Semaphore error: {}", e))),
                    };
                    (index, metric, reading)
                });
            }
        }

        let total = reads.len();
        let mut failures = 0usize;

        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok((index, _, Ok(reading))) => reading.apply(&mut recipes[index]),
                Ok((index, metric, Err(e))) => {
                    failures += 1;
                    tracing::warn!(
                        error = %e,
                        recipe_id = %recipes[index].recipe_id,
                        metric = %metric,
                        "Metric read failed, keeping previous value"
                    );
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(error = %e, "Metric read task join error");
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                recipes = recipes.len(),
                reads = total,
                failures = failures,
                "Partial enrichment failure"
            );
        } else {
            tracing::debug!(recipes = recipes.len(), reads = total, "Enrichment completed");
        }

        recipes
    }

    /// Reads the three metrics of one recipe concurrently, zero for anything unreadable
    pub async fn metrics_for(&self, recipe_id: &str) -> PopularityMetrics {
        let store = self.store.as_ref();
        let (views, saves, rating) = tokio::join!(
            store.views(recipe_id),
            store.saves(recipe_id),
            store.average_rating(recipe_id),
        );

        let mut recipe = Recipe::new(recipe_id, String::new());
        for reading in [
            views.map(Reading::Views),
            saves.map(Reading::Saves),
            rating.map(Reading::AverageRating),
        ] {
            match reading {
                Ok(reading) => reading.apply(&mut recipe),
                Err(e) => {
                    tracing::warn!(error = %e, recipe_id = %recipe_id, "Metric read failed");
                }
            }
        }

        recipe.metrics()
    }
}
