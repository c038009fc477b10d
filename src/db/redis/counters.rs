use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;

use crate::error::AppResult;
use crate::models::{Counter, Metric};

/// Key of one popularity counter in Redis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    recipe_id: String,
    metric: Metric,
}

impl CounterKey {
    pub fn new(recipe_id: &str, metric: Metric) -> Self {
        Self {
            recipe_id: recipe_id.to_string(),
            metric,
        }
    }
}

impl Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "recipe:{}:{}", self.recipe_id, self.metric)
    }
}

/// Creates a Redis client for popularity counters
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Popularity counters kept in Redis
///
/// Each metric of each recipe is its own key, so the three reads for a recipe
/// are independent and can fail independently. `INCR` gives increment-or-initialize
/// semantics without a read-modify-write round trip. All reads and writes share
/// one multiplexed connection that reconnects on its own.
#[derive(Clone)]
pub struct RedisCounters {
    connection: ConnectionManager,
}

impl RedisCounters {
    pub async fn new(redis_client: Client) -> AppResult<Self> {
        let connection = ConnectionManager::new(redis_client).await?;
        Ok(Self { connection })
    }

    /// Reads an integer counter, `None` when the key does not exist
    pub async fn get_count(&self, key: &CounterKey) -> AppResult<Option<u64>> {
        let mut conn = self.connection.clone();
        let value: Option<u64> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    /// Reads a float value, `None` when the key does not exist
    pub async fn get_rating(&self, key: &CounterKey) -> AppResult<Option<f64>> {
        let mut conn = self.connection.clone();
        let value: Option<f64> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    pub async fn increment(&self, recipe_id: &str, counter: Counter) -> AppResult<u64> {
        let key = CounterKey::new(recipe_id, counter.into());
        let mut conn = self.connection.clone();
        let value: u64 = conn.incr(key.to_string(), 1u64).await?;

        tracing::debug!(key = %key, value = value, "Counter incremented");

        Ok(value)
    }

    pub async fn set_rating(&self, recipe_id: &str, rating: f64) -> AppResult<()> {
        let key = CounterKey::new(recipe_id, Metric::AverageRating);
        let mut conn = self.connection.clone();
        let _: () = conn.set(key.to_string(), rating).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_key_display_views() {
        let key = CounterKey::new("52771", Metric::Views);
        assert_eq!(format!("{}", key), "recipe:52771:views");
    }

    #[test]
    fn test_counter_key_display_saves() {
        let key = CounterKey::new("52771", Metric::Saves);
        assert_eq!(format!("{}", key), "recipe:52771:saves");
    }

    #[test]
    fn test_counter_key_display_rating() {
        let key = CounterKey::new("abc", Metric::AverageRating);
        assert_eq!(format!("{}", key), "recipe:abc:rating");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_increment_initializes_missing_counter() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let counters = RedisCounters::new(client.clone()).await.unwrap();

        let recipe_id = format!("test-{}", uuid::Uuid::new_v4());
        let key = CounterKey::new(&recipe_id, Metric::Views);

        assert_eq!(counters.get_count(&key).await.unwrap(), None);
        assert_eq!(counters.increment(&recipe_id, Counter::Views).await.unwrap(), 1);
        assert_eq!(counters.increment(&recipe_id, Counter::Views).await.unwrap(), 2);
        assert_eq!(counters.get_count(&key).await.unwrap(), Some(2));

        // Clean up
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_rating_round_trip() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let counters = RedisCounters::new(client.clone()).await.unwrap();

        let recipe_id = format!("test-{}", uuid::Uuid::new_v4());
        counters.set_rating(&recipe_id, 4.25).await.unwrap();

        let key = CounterKey::new(&recipe_id, Metric::AverageRating);
        assert_eq!(counters.get_rating(&key).await.unwrap(), Some(4.25));

        // Clean up
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_concurrent_increments_share_one_connection() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let counters = RedisCounters::new(client.clone()).await.unwrap();

        let recipe_id = format!("test-{}", uuid::Uuid::new_v4());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..64 {
            let counters = counters.clone();
            let recipe_id = recipe_id.clone();
            tasks.spawn(async move { counters.increment(&recipe_id, Counter::Saves).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let key = CounterKey::new(&recipe_id, Metric::Saves);
        assert_eq!(counters.get_count(&key).await.unwrap(), Some(64));

        // Clean up
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
