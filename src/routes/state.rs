use std::sync::Arc;

use crate::{
    db::{CounterWriter, DocumentStore},
    services::{
        catalog::CatalogClient, PopularityEnricher, RecommendationRanker, SearchAggregator,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<SearchAggregator>,
    pub ranker: Arc<RecommendationRanker>,
    pub enricher: PopularityEnricher,
    pub store: Arc<dyn DocumentStore>,
    pub counters: CounterWriter,
}

impl AppState {
    /// Wires the services around one catalog and one document store
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        store: Arc<dyn DocumentStore>,
        counters: CounterWriter,
        enrich_concurrency: usize,
    ) -> Self {
        let enricher = PopularityEnricher::new(Arc::clone(&store), enrich_concurrency);

        Self {
            aggregator: Arc::new(SearchAggregator::new(
                Arc::clone(&catalog),
                Arc::clone(&store),
                enricher.clone(),
            )),
            ranker: Arc::new(RecommendationRanker::new(catalog, Arc::clone(&store))),
            enricher,
            store,
            counters,
        }
    }
}
