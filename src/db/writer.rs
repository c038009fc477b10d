use std::sync::Arc;

use tokio::sync::mpsc;

use crate::db::DocumentStore;
use crate::models::Counter;

/// Message for an asynchronous counter increment
#[derive(Debug)]
struct IncrementMessage {
    recipe_id: String,
    counter: Counter,
}

/// Fire-and-forget counter increments
///
/// Views and saves are recorded off the request path: callers enqueue an
/// increment and return immediately, a background task applies it to the store.
#[derive(Clone)]
pub struct CounterWriter {
    write_tx: mpsc::UnboundedSender<IncrementMessage>,
}

/// Handle for gracefully shutting down the counter writer
pub struct CounterWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CounterWriterHandle {
    /// Signals the writer to stop and waits until every queued increment is applied
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Counter writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Counter writer task failed");
        }
    }
}

impl CounterWriter {
    /// Spawns the background task that applies increments to `store`
    pub fn spawn(store: Arc<dyn DocumentStore>) -> (Self, CounterWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            Self::writer_task(store, write_rx, shutdown_rx).await;
        });

        (Self { write_tx }, CounterWriterHandle { shutdown_tx, task })
    }

    /// Background task that processes increment messages
    ///
    /// On shutdown, drains whatever is still queued before exiting.
    async fn writer_task(
        store: Arc<dyn DocumentStore>,
        mut write_rx: mpsc::UnboundedReceiver<IncrementMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(store = store.name(), "Counter writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    Self::apply(store.as_ref(), msg).await;
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        Self::apply(store.as_ref(), msg).await;
                        flushed += 1;
                    }

                    tracing::info!(flushed = flushed, "Counter writer task stopped");
                    break;
                }
            }
        }
    }

    async fn apply(store: &dyn DocumentStore, msg: IncrementMessage) {
        if let Err(e) = store.increment(&msg.recipe_id, msg.counter).await {
            tracing::error!(
                error = %e,
                recipe_id = %msg.recipe_id,
                counter = ?msg.counter,
                "Failed to increment counter"
            );
        }
    }

    /// Queues an increment without waiting for it to be applied
    pub fn record(&self, recipe_id: &str, counter: Counter) {
        let msg = IncrementMessage {
            recipe_id: recipe_id.to_string(),
            counter,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to queue counter increment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryDocumentStore;

    #[tokio::test]
    async fn test_shutdown_flushes_queued_increments() {
        let store = InMemoryDocumentStore::new();
        let (writer, handle) = CounterWriter::spawn(Arc::new(store.clone()));

        for _ in 0..5 {
            writer.record("1", Counter::Views);
        }
        writer.record("1", Counter::Saves);

        handle.shutdown().await;

        assert_eq!(store.views("1").await.unwrap(), Some(5));
        assert_eq!(store.saves("1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_record_after_shutdown_does_not_panic() {
        let store = InMemoryDocumentStore::new();
        let (writer, handle) = CounterWriter::spawn(Arc::new(store.clone()));
        handle.shutdown().await;

        writer.record("1", Counter::Views);
        assert_eq!(store.views("1").await.unwrap(), None);
    }
}
