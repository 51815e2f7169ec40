use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{AccountingFailure, ViewCommand, ViewCounter};
use crate::catalog::CatalogStore;
use crate::metrics::{VIEW_INCREMENTS_APPLIED, VIEW_INCREMENTS_FAILED};

/// Background task that applies recorded views to the store.
///
/// Whatever is queued when the task wakes up is merged into one delta per
/// video, so a burst of N reads of one video costs one `UPDATE`.
pub struct ViewCountWriter {
    rx: mpsc::UnboundedReceiver<ViewCommand>,
    store: Arc<dyn CatalogStore>,
    pending: HashMap<String, u64>,
}

impl ViewCountWriter {
    fn new(rx: mpsc::UnboundedReceiver<ViewCommand>, store: Arc<dyn CatalogStore>) -> Self {
        Self {
            rx,
            store,
            pending: HashMap::new(),
        }
    }

    /// Run until every [`ViewCounter`] has been dropped, then drain.
    ///
    /// Spawn with `tokio::spawn(writer.run())`.
    pub async fn run(mut self) {
        tracing::info!("View accounting writer started");

        while let Some(command) = self.rx.recv().await {
            let mut waiters = Vec::new();
            self.absorb(command, &mut waiters);
            while let Ok(command) = self.rx.try_recv() {
                self.absorb(command, &mut waiters);
            }

            self.apply_pending().await;

            for waiter in waiters {
                let _ = waiter.send(());
            }
        }

        tracing::info!("View accounting writer shutting down");
    }

    fn absorb(&mut self, command: ViewCommand, waiters: &mut Vec<oneshot::Sender<()>>) {
        match command {
            ViewCommand::Record(video_id) => *self.pending.entry(video_id).or_insert(0) += 1,
            ViewCommand::Flush(done) => waiters.push(done),
        }
    }

    async fn apply_pending(&mut self) {
        for (video_id, delta) in self.pending.drain() {
            match self.store.increment_views(&video_id, delta).await {
                Ok(()) => {
                    VIEW_INCREMENTS_APPLIED.inc_by(delta);
                    tracing::trace!(video_id = %video_id, delta, "Views applied");
                }
                Err(source) => {
                    VIEW_INCREMENTS_FAILED.inc_by(delta);
                    let failure = AccountingFailure::Increment {
                        video_id,
                        delta,
                        source,
                    };
                    tracing::warn!(error = %failure, "View accounting failed");
                }
            }
        }
    }
}

/// Create the view accounting pair.
///
/// Returns:
/// - `ViewCounter` - clone this into whatever serves reads
/// - `ViewCountWriter` - spawn this as a background task
pub fn create_view_accounting(store: Arc<dyn CatalogStore>) -> (ViewCounter, ViewCountWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ViewCounter::new(tx), ViewCountWriter::new(rx, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockCatalogStore};

    fn store_with(ids: &[&str]) -> Arc<MockCatalogStore> {
        let store = Arc::new(MockCatalogStore::new());
        for id in ids {
            store.add_video(fixtures::video(id, "Counted"));
        }
        store
    }

    #[tokio::test]
    async fn test_views_are_applied_and_coalesced() {
        let store = store_with(&["v1", "v2"]);
        let (counter, writer) = create_view_accounting(store.clone());

        for _ in 0..5 {
            counter.record("v1");
        }
        counter.record("v2");

        // Start after recording so everything lands in one batch.
        let writer_handle = tokio::spawn(writer.run());
        counter.flush().await.unwrap();

        assert_eq!(store.views("v1"), Some(5));
        assert_eq!(store.views("v2"), Some(1));
        assert_eq!(store.increment_calls(), 2);

        drop(counter);
        writer_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_increment_does_not_stop_writer() {
        let store = store_with(&["v1"]);
        let (counter, writer) = create_view_accounting(store.clone());
        let writer_handle = tokio::spawn(writer.run());

        counter.record("missing");
        counter.flush().await.unwrap();

        store.set_fail_increments(true);
        counter.record("v1");
        counter.flush().await.unwrap();
        assert_eq!(store.views("v1"), Some(0));

        store.set_fail_increments(false);
        counter.record("v1");
        counter.flush().await.unwrap();
        assert_eq!(store.views("v1"), Some(1));

        drop(counter);
        writer_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_drains_when_all_counters_dropped() {
        let store = store_with(&["v1"]);
        let (counter, writer) = create_view_accounting(store.clone());
        let other = counter.clone();
        let writer_handle = tokio::spawn(writer.run());

        counter.record("v1");
        other.record("v1");
        drop(counter);
        other.record("v1");
        drop(other);

        tokio::time::timeout(std::time::Duration::from_secs(1), writer_handle)
            .await
            .expect("writer should exit once every counter is dropped")
            .unwrap();
        assert_eq!(store.views("v1"), Some(3));
    }
}
