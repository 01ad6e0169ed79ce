// ── Provisioning table observation ──
//
// A `RecordStream` follows the store's snapshot channel through a
// `RecordFilter` and only reports changes to the records it selects, so
// an observer of one OLT is not woken by provisioning on another.

mod filter;

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::WatchStream;

use crate::model::ProvisioningRecord;

pub use filter::RecordFilter;

/// Immutable view of records, ordered by attachment point.
pub type RecordSnapshot = Arc<Vec<Arc<ProvisioningRecord>>>;

pub struct RecordStream {
    filter: RecordFilter,
    /// Filtered view last handed out.
    view: RecordSnapshot,
    receiver: watch::Receiver<RecordSnapshot>,
}

impl RecordStream {
    pub(crate) fn new(mut receiver: watch::Receiver<RecordSnapshot>, filter: RecordFilter) -> Self {
        let view = filter.apply(&receiver.borrow_and_update());
        Self {
            filter,
            view,
            receiver,
        }
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// The selected records as of creation or the last reported change.
    pub fn view(&self) -> &RecordSnapshot {
        &self.view
    }

    /// Wait until the selected records differ from [`view`](Self::view).
    /// Mutations elsewhere in the table are skipped. `None` once the store
    /// is gone.
    pub async fn next_change(&mut self) -> Option<RecordSnapshot> {
        loop {
            self.receiver.changed().await.ok()?;
            let view = self.filter.apply(&self.receiver.borrow_and_update());
            if view != self.view {
                self.view = Arc::clone(&view);
                return Some(view);
            }
        }
    }

    /// Filtered snapshots, starting with the current one, then one per
    /// table mutation.
    pub fn into_stream(self) -> impl Stream<Item = RecordSnapshot> + Send + Unpin {
        let Self {
            filter, receiver, ..
        } = self;
        WatchStream::new(receiver).map(move |snapshot| filter.apply(&snapshot))
    }
}
