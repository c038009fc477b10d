use std::sync::Arc;
use std::time::Duration;

use recipe_hub::{
    config::Config,
    db::{self, CounterWriter, DocumentStore, PgDocumentStore, RedisCounters},
    routes::{create_router, AppState},
    services::catalog::{CatalogClient, MealDbCatalog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Document store: Postgres documents + Redis counters
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let redis_client = db::create_redis_client(&config.redis_url)?;
    let counters = RedisCounters::new(redis_client).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool, counters));

    let catalog: Arc<dyn CatalogClient> = Arc::new(MealDbCatalog::new(
        config.catalog_api_url.clone(),
        Duration::from_secs(config.catalog_timeout_secs),
    )?);

    let (counters, counters_handle) = CounterWriter::spawn(Arc::clone(&store));

    tracing::info!(
        store = store.name(),
        catalog = catalog.name(),
        enrich_concurrency = config.enrich_concurrency,
        "Services initialized"
    );

    let state = AppState::new(catalog, store, counters, config.enrich_concurrency);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    counters_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
