use thiserror::Error;

use crate::context::ContextError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid capacity {capacity}: must be in 1..{max}", max = crate::config::MAX_CAPACITY)]
    InvalidCapacity { capacity: usize },

    #[error("Queue is closed")]
    Closed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out")]
    Timeout,
}

impl QueueError {
    /// `true` when the same call may succeed with a fresh context.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Cancelled | QueueError::Timeout)
    }
}

impl From<ContextError> for QueueError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => QueueError::Cancelled,
            ContextError::DeadlineExceeded => QueueError::Timeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
