use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::QueueConfig,
    context::Context,
    error::{QueueError, Result},
    metrics::{MetricsSnapshot, QueueMetrics},
    queues::{LatestSlot, transfer},
};

/// Bounded "latest wins" hand-off between producers and consumers.
///
/// Producers [`submit`](Self::submit) into a FIFO staging buffer of fixed
/// capacity. A background task, started by the first submit, moves every
/// staged item into a single slot, overwriting whatever the consumers have
/// not taken yet. [`retrieve`](Self::retrieve) therefore only ever sees the
/// freshest item.
///
/// The queue is not `Clone`; share it behind an `Arc`. Dropping it closes it.
pub struct CoalescingQueue<T> {
    shared: Arc<Shared<T>>,
}

pub(crate) struct Shared<T> {
    pub(crate) id: Uuid,
    pub(crate) capacity: usize,
    pub(crate) closed: CancellationToken,
    /// `None` once released by `close`. Read-held by anything that sends into
    /// the staging buffer or touches the slot; write-held only by `close`.
    pub(crate) stages: RwLock<Option<Stages<T>>>,
    /// Staging receiver, until the transfer task claims it.
    intake: Mutex<Option<mpsc::Receiver<T>>>,
    started: AtomicBool,
    pub(crate) metrics: QueueMetrics,
}

pub(crate) struct Stages<T> {
    pub(crate) staging: mpsc::Sender<T>,
    pub(crate) slot: LatestSlot<T>,
}

impl<T: Send + 'static> CoalescingQueue<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(QueueConfig::with_capacity(capacity))
    }

    pub fn with_default_capacity() -> Self {
        Self::build(QueueConfig::default().capacity)
    }

    pub fn with_config(cfg: QueueConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::build(cfg.capacity))
    }

    fn build(capacity: usize) -> Self {
        let (staging, intake) = mpsc::channel(capacity);

        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                capacity,
                closed: CancellationToken::new(),
                stages: RwLock::new(Some(Stages {
                    staging,
                    slot: LatestSlot::new(),
                })),
                intake: Mutex::new(Some(intake)),
                started: AtomicBool::new(false),
                metrics: QueueMetrics::new(),
            }),
        }
    }

    /// Stages `item` for publication, waiting while the staging buffer is full.
    ///
    /// Fails with [`QueueError::Closed`] if the queue is or becomes closed, and
    /// with [`QueueError::Cancelled`]/[`QueueError::Timeout`] if `ctx` fires
    /// first. A successful return does not mean a consumer will see `item`; a
    /// later submission may supersede it.
    pub async fn submit(&self, ctx: &Context, item: T) -> Result<()> {
        self.ensure_transfer();

        if self.shared.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let stages = self.shared.stages.read().await;
        let Some(stages) = stages.as_ref() else {
            return Err(QueueError::Closed);
        };

        let permit = tokio::select! {
            biased;
            _ = self.shared.closed.cancelled() => return Err(QueueError::Closed),
            permit = stages.staging.reserve() => permit.map_err(|_| QueueError::Closed)?,
            err = ctx.done() => return Err(err.into()),
        };
        permit.send(item);
        self.shared.metrics.record_submitted();

        Ok(())
    }

    /// Waits for the freshest published item.
    ///
    /// `Ok(None)` means the queue is closed and will never yield again;
    /// `Err` means `ctx` fired first.
    pub async fn retrieve(&self, ctx: &Context) -> Result<Option<T>> {
        if self.shared.closed.is_cancelled() {
            return Ok(None);
        }
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let stages = self.shared.stages.read().await;
        let Some(stages) = stages.as_ref() else {
            return Ok(None);
        };

        tokio::select! {
            biased;
            _ = self.shared.closed.cancelled() => Ok(None),
            item = stages.slot.recv() => {
                self.shared.metrics.record_delivered();
                Ok(Some(item))
            }
            err = ctx.done() => Err(err.into()),
        }
    }

    /// Takes the published item if there is one, without waiting.
    pub fn try_retrieve(&self) -> Option<T> {
        if self.shared.closed.is_cancelled() {
            return None;
        }
        let stages = self.shared.stages.try_read().ok()?;
        let item = stages.as_ref()?.slot.try_take()?;
        self.shared.metrics.record_delivered();
        Some(item)
    }

    /// Closes the queue and releases the staging buffer and the slot.
    ///
    /// Blocked submitters and retrievers are woken with the closed outcome.
    /// Safe to call any number of times, concurrently; only the first call
    /// tears anything down.
    pub async fn close(&self) {
        self.shared.closed.cancel();

        let released = self.shared.stages.write().await.take();
        let unclaimed = self
            .shared
            .intake
            .lock()
            .expect("CoalescingQueue intake poisoned")
            .take();

        if let Some(stages) = released {
            let discarded = stages.slot.is_occupied();
            drop(stages);
            drop(unclaimed);
            debug!(
                queue_id = %self.shared.id,
                discarded,
                "queue closed, staging and slot released"
            );
        }
    }

    fn ensure_transfer(&self) {
        if self.shared.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let intake = self
            .shared
            .intake
            .lock()
            .expect("CoalescingQueue intake poisoned")
            .take();

        if let Some(intake) = intake {
            tokio::spawn(transfer::run(Arc::clone(&self.shared), intake));
        }
    }
}

impl<T> CoalescingQueue<T> {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Items currently waiting in the staging buffer.
    pub fn staged(&self) -> usize {
        match self.shared.stages.try_read() {
            Ok(stages) => stages
                .as_ref()
                .map_or(0, |s| self.shared.capacity - s.staging.capacity()),
            Err(_) => 0,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl<T: Send + 'static> Default for CoalescingQueue<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl<T> Drop for CoalescingQueue<T> {
    fn drop(&mut self) {
        self.shared.closed.cancel();
    }
}

impl<T> std::fmt::Debug for CoalescingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingQueue")
            .field("id", &self.shared.id)
            .field("capacity", &self.shared.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
