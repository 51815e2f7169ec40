//! View accounting.
//!
//! Reads must never wait on, or fail because of, a view counter write. Each
//! successful single-video read records one view through a [`ViewCounter`];
//! a background [`ViewCountWriter`] coalesces those into per-video deltas and
//! applies them with atomic increments.

mod counter;
mod writer;

pub use counter::*;
pub use writer::*;

use thiserror::Error;

use crate::catalog::CatalogError;

/// A view that could not be persisted. Logged and counted, never returned to
/// the reader whose request produced it.
#[derive(Debug, Error)]
pub enum AccountingFailure {
    #[error("View accounting writer is not running")]
    WriterGone,

    #[error("Failed to add {delta} view(s) to video {video_id}: {source}")]
    Increment {
        video_id: String,
        delta: u64,
        #[source]
        source: CatalogError,
    },
}
