use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    models::Recipe,
    services::{recommendations::RecommendationRanker, search::SearchAggregator},
};

/// What the presentation layer receives for one user action
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Recipes(Vec<Recipe>),
    Recommendation { category: String, recipes: Vec<Recipe> },
    Error(String),
}

/// One user's interactive session
///
/// Each action supersedes the one before it: the previous in-flight task is
/// aborted, and a result is published only while its action is still the latest,
/// so a slow stale search can never overwrite a newer result.
pub struct SearchSession {
    aggregator: Arc<SearchAggregator>,
    ranker: Arc<RecommendationRanker>,
    generation: Arc<AtomicU64>,
    updates: Arc<watch::Sender<Option<SessionUpdate>>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl SearchSession {
    pub fn new(aggregator: Arc<SearchAggregator>, ranker: Arc<RecommendationRanker>) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            aggregator,
            ranker,
            generation: Arc::new(AtomicU64::new(0)),
            updates: Arc::new(updates),
            in_flight: Mutex::new(None),
        }
    }

    /// Receiver that always holds the latest published update
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUpdate>> {
        self.updates.subscribe()
    }

    /// Starts a search; returns the generation assigned to it
    pub fn on_search(&self, name: impl Into<String>, category: Option<String>) -> u64 {
        let aggregator = Arc::clone(&self.aggregator);
        let name = name.into();
        self.dispatch(async move {
            match aggregator.search(&name, category.as_deref()).await {
                Ok(recipes) => SessionUpdate::Recipes(recipes),
                Err(e) => SessionUpdate::Error(e.to_string()),
            }
        })
    }

    /// Starts a recommendation lookup; returns the generation assigned to it
    pub fn on_recommend(&self, username: impl Into<String>) -> u64 {
        let ranker = Arc::clone(&self.ranker);
        let username = username.into();
        self.dispatch(async move {
            match ranker.recommend(&username).await {
                Ok(recommendation) => SessionUpdate::Recommendation {
                    category: recommendation.category,
                    recipes: recommendation.recipes,
                },
                Err(e) => SessionUpdate::Error(e.to_string()),
            }
        })
    }

    fn dispatch<F>(&self, work: F) -> u64
    where
        F: Future<Output = SessionUpdate> + Send + 'static,
    {
        // Generation bump and handle swap happen under one lock, so the task
        // left in flight always belongs to the newest generation
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let updates = Arc::clone(&self.updates);

        let handle = tokio::spawn(async move {
            let update = work.await;
            // Checked under the channel lock so publication is ordered with the check
            let published = updates.send_if_modified(|slot| {
                if latest.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *slot = Some(update);
                true
            });
            if !published {
                tracing::debug!(generation = generation, "Dropping superseded session result");
            }
        });

        if let Some(previous) = in_flight.replace(handle) {
            previous.abort();
        }

        generation
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(handle) = in_flight.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStore, InMemoryDocumentStore};
    use crate::error::AppResult;
    use crate::models::User;
    use crate::services::catalog::{CatalogClient, InMemoryCatalog};
    use crate::services::enrichment::PopularityEnricher;
    use std::time::Duration;

    /// Catalog whose latency depends on the query
    struct SlowFirstCatalog;

    #[async_trait::async_trait]
    impl CatalogClient for SlowFirstCatalog {
        async fn search(&self, query: &str) -> AppResult<Vec<Recipe>> {
            if query == "slow" {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            Ok(vec![Recipe::new(query, query)])
        }
        async fn by_category(&self, _: &str) -> AppResult<Vec<Recipe>> {
            Ok(vec![])
        }
        async fn list_categories(&self) -> AppResult<Vec<String>> {
            Ok(vec![])
        }
        fn name(&self) -> &'static str {
            "slow-first"
        }
    }

    fn session(catalog: Arc<dyn CatalogClient>, store: InMemoryDocumentStore) -> SearchSession {
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let aggregator = SearchAggregator::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            PopularityEnricher::new(Arc::clone(&store), 8),
        );
        let ranker = RecommendationRanker::new(catalog, store);
        SearchSession::new(Arc::new(aggregator), Arc::new(ranker))
    }

    async fn next_update(rx: &mut watch::Receiver<Option<SessionUpdate>>) -> SessionUpdate {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("no update published")
            .unwrap();
        rx.borrow_and_update().clone().unwrap()
    }

    #[tokio::test]
    async fn test_search_publishes_results() {
        let catalog = InMemoryCatalog::new(vec![Recipe::new("1", "Pasta")]);
        let session = session(Arc::new(catalog), InMemoryDocumentStore::new());
        let mut rx = session.subscribe();

        session.on_search("pasta", None);

        match next_update(&mut rx).await {
            SessionUpdate::Recipes(recipes) => assert_eq!(recipes[0].title, "Pasta"),
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_newer_search_wins_over_slow_stale_one() {
        let session = session(Arc::new(SlowFirstCatalog), InMemoryDocumentStore::new());
        let mut rx = session.subscribe();

        let stale = session.on_search("slow", None);
        let fresh = session.on_search("fast", None);
        assert!(fresh > stale);

        match next_update(&mut rx).await {
            SessionUpdate::Recipes(recipes) => assert_eq!(recipes[0].recipe_id, "fast"),
            other => panic!("unexpected update {:?}", other),
        }

        // Give the stale search time to finish had it not been superseded
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!rx.has_changed().unwrap());
        let state = rx.borrow().clone();
        match state {
            Some(SessionUpdate::Recipes(recipes)) => assert_eq!(recipes[0].recipe_id, "fast"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_actions_always_publish_the_latest() {
        // Latency keeps the older action from publishing before the newer one lands
        let catalog = InMemoryCatalog::new(vec![Recipe::new("1", "Pasta")])
            .with_latency(Duration::from_millis(10));
        let session = session(Arc::new(catalog), InMemoryDocumentStore::new());
        let mut rx = session.subscribe();
        let runtime = tokio::runtime::Handle::current();

        for round in 0..300 {
            let barrier = std::sync::Barrier::new(2);
            let generations: Vec<u64> = std::thread::scope(|scope| {
                let callers: Vec<_> = (0..2)
                    .map(|_| {
                        scope.spawn(|| {
                            let _guard = runtime.enter();
                            barrier.wait();
                            session.on_search("pasta", None)
                        })
                    })
                    .collect();
                callers.into_iter().map(|c| c.join().unwrap()).collect()
            });
            assert_eq!(generations.iter().max(), Some(&(2 * round + 2)));

            match next_update(&mut rx).await {
                SessionUpdate::Recipes(recipes) => assert_eq!(recipes[0].title, "Pasta"),
                other => panic!("unexpected update {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_errors_are_published_as_messages() {
        let session = session(Arc::new(InMemoryCatalog::failing()), InMemoryDocumentStore::new());
        let mut rx = session.subscribe();

        session.on_search("pasta", None);

        match next_update(&mut rx).await {
            SessionUpdate::Error(message) => assert!(message.contains("503")),
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recommend_without_favorites() {
        let store = InMemoryDocumentStore::new();
        store.insert_user(User::new("ana")).await;
        let session = session(Arc::new(InMemoryCatalog::default()), store);
        let mut rx = session.subscribe();

        session.on_recommend("ana");

        assert_eq!(
            next_update(&mut rx).await,
            SessionUpdate::Error("No favorites saved yet".to_string())
        );
    }
}
