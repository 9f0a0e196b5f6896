use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::queues::coalescing_queue::Shared;

/// Drains the staging buffer into the slot until the queue closes.
///
/// Never waits for a consumer: an unconsumed item in the slot is replaced.
pub(crate) async fn run<T: Send + 'static>(shared: Arc<Shared<T>>, mut intake: mpsc::Receiver<T>) {
    debug!(queue_id = %shared.id, capacity = shared.capacity, "transfer started");

    loop {
        let item = tokio::select! {
            biased;
            _ = shared.closed.cancelled() => break,
            item = intake.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        if !publish(&shared, item).await {
            break;
        }
    }

    debug!(queue_id = %shared.id, "transfer stopped");
}

/// Returns `false` once the queue is closed and nothing may be published.
async fn publish<T>(shared: &Shared<T>, item: T) -> bool {
    let stages = shared.stages.read().await;
    let Some(stages) = stages.as_ref() else {
        return false;
    };
    if shared.closed.is_cancelled() {
        return false;
    }

    if stages.slot.replace(item).is_some() {
        shared.metrics.record_superseded();
        trace!(queue_id = %shared.id, "superseded unconsumed item");
    }
    true
}
