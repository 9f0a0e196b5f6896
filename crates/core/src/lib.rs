pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod queues;

pub use config::{DEFAULT_CAPACITY, MAX_CAPACITY, QueueConfig};
pub use context::{Context, ContextError};
pub use error::{QueueError, Result};
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use queues::{CoalescingQueue, LatestSlot};
