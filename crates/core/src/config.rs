use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

pub const DEFAULT_CAPACITY: usize = 1000;

/// Exclusive upper bound for the staging capacity.
pub const MAX_CAPACITY: usize = i32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on items waiting in the staging buffer.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity >= MAX_CAPACITY {
            return Err(QueueError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_valid() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.capacity, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_capacity() {
        assert_eq!(
            QueueConfig::with_capacity(0).validate(),
            Err(QueueError::InvalidCapacity { capacity: 0 })
        );
        assert_eq!(
            QueueConfig::with_capacity(MAX_CAPACITY).validate(),
            Err(QueueError::InvalidCapacity {
                capacity: MAX_CAPACITY
            })
        );
        assert!(QueueConfig::with_capacity(MAX_CAPACITY - 1).validate().is_ok());
        assert!(QueueConfig::with_capacity(1).validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, QueueConfig::default());

        let cfg: QueueConfig = serde_json::from_str(r#"{"capacity": 8}"#).unwrap();
        assert_eq!(cfg.capacity, 8);
    }
}
