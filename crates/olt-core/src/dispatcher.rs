// ── Lifecycle event dispatch ──
//
// Every listener owns an unbounded queue drained by its own task, so
// publishing never waits on a listener and a slow or failing listener
// cannot delay the others. Delivery order per listener is publish order.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::ListenerError;
use crate::model::AccessDeviceEvent;

/// Observer of provisioning lifecycle events.
pub trait AccessDeviceListener: Send + Sync + 'static {
    fn event(&self, event: &AccessDeviceEvent) -> Result<(), ListenerError>;

    /// Filter applied before [`event`](Self::event). Defaults to everything.
    fn is_relevant(&self, _event: &AccessDeviceEvent) -> bool {
        true
    }
}

/// Token returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Subscription {
    queue: mpsc::UnboundedSender<Arc<AccessDeviceEvent>>,
    task: JoinHandle<()>,
}

#[derive(Default)]
pub struct EventDispatcher {
    next_id: AtomicU64,
    subscriptions: DashMap<SubscriptionHandle, Subscription>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Must be called from within a tokio runtime.
    pub fn subscribe(&self, listener: Arc<dyn AccessDeviceListener>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (queue, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver(handle, listener, rx));
        self.subscriptions.insert(handle, Subscription { queue, task });
        debug!(?handle, "listener subscribed");
        handle
    }

    /// Stop delivering to a listener. Events already queued are still
    /// delivered. Returns `false` for unknown handles.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        // Dropping the sender closes the queue; the task exits once drained.
        self.subscriptions.remove(&handle).is_some()
    }

    /// Queue an event for every listener without waiting for delivery.
    pub fn publish(&self, event: AccessDeviceEvent) {
        let event = Arc::new(event);
        debug!(
            kind = %event.kind,
            attachment_point = %event.attachment_point,
            listeners = self.subscriptions.len(),
            "publishing event"
        );

        let mut closed = Vec::new();
        for sub in &self.subscriptions {
            if sub.queue.send(Arc::clone(&event)).is_err() {
                closed.push(*sub.key());
            }
        }
        for handle in closed {
            warn!(?handle, "listener task gone, dropping subscription");
            self.subscriptions.remove(&handle);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Close every queue and wait for the delivery tasks to drain.
    pub async fn shutdown(&self) {
        let handles: Vec<SubscriptionHandle> =
            self.subscriptions.iter().map(|s| *s.key()).collect();
        let tasks: Vec<(SubscriptionHandle, JoinHandle<()>)> = handles
            .iter()
            .filter_map(|h| self.subscriptions.remove(h))
            .map(|(handle, sub)| (handle, sub.task))
            .collect();

        for (handle, task) in tasks {
            if let Err(e) = task.await {
                warn!(?handle, error = %e, "delivery task ended abnormally");
            }
        }
    }
}

/// Drain one listener's queue until its sender is dropped.
async fn deliver(
    handle: SubscriptionHandle,
    listener: Arc<dyn AccessDeviceListener>,
    mut rx: mpsc::UnboundedReceiver<Arc<AccessDeviceEvent>>,
) {
    while let Some(event) = rx.recv().await {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            if listener.is_relevant(&event) {
                listener.event(&event)
            } else {
                Ok(())
            }
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(?handle, kind = %event.kind, error = %e, "listener failed"),
            Err(_) => error!(?handle, kind = %event.kind, "listener panicked"),
        }
    }
    debug!(?handle, "listener queue closed");
}
