use tokio::sync::{mpsc, oneshot};

use super::AccountingFailure;

#[derive(Debug)]
pub(crate) enum ViewCommand {
    Record(String),
    Flush(oneshot::Sender<()>),
}

/// Handle for recording views.
///
/// Cheaply cloneable. Recording never blocks and never fails the caller; the
/// channel is unbounded so a slow store cannot push back on reads.
#[derive(Clone)]
pub struct ViewCounter {
    tx: mpsc::UnboundedSender<ViewCommand>,
}

impl ViewCounter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ViewCommand>) -> Self {
        Self { tx }
    }

    /// Record one view of `video_id`.
    pub fn record(&self, video_id: &str) {
        if self.tx.send(ViewCommand::Record(video_id.to_string())).is_err() {
            let failure = AccountingFailure::WriterGone;
            tracing::warn!(video_id = %video_id, error = %failure, "View dropped");
            crate::metrics::VIEW_INCREMENTS_FAILED.inc();
        }
    }

    /// Wait until every view recorded before this call has been applied (or
    /// has failed and been logged).
    pub async fn flush(&self) -> Result<(), AccountingFailure> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(ViewCommand::Flush(done_tx))
            .map_err(|_| AccountingFailure::WriterGone)?;
        done_rx.await.map_err(|_| AccountingFailure::WriterGone)
    }
}
