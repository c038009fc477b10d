pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;
pub mod writer;

pub use memory::InMemoryDocumentStore;
pub use postgres::{create_pool, run_migrations, PgDocumentStore};
pub use redis::create_redis_client;
pub use redis::RedisCounters;
pub use store::DocumentStore;
pub use writer::{CounterWriter, CounterWriterHandle};

#[cfg(test)]
pub use store::MockDocumentStore;
