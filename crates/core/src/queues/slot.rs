use std::sync::Mutex;

use tokio::sync::Notify;

/// Capacity-one hand-off cell: holds at most the freshest unconsumed item.
pub struct LatestSlot<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Publishes `value`, returning the unconsumed item it displaced.
    pub fn replace(&self, value: T) -> Option<T> {
        let prev = self
            .slot
            .lock()
            .expect("LatestSlot poisoned")
            .replace(value);
        self.notify.notify_one();
        prev
    }

    pub fn try_take(&self) -> Option<T> {
        self.slot.lock().expect("LatestSlot poisoned").take()
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.lock().expect("LatestSlot poisoned").is_some()
    }

    /// Waits until an item is published and takes it.
    pub async fn recv(&self) -> T {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a publish between the check and the
            // await is not missed.
            notified.as_mut().enable();

            if let Some(value) = self.try_take() {
                return value;
            }
            notified.await;
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[test]
    fn replace_returns_displaced_item() {
        let slot = LatestSlot::new();
        assert_eq!(slot.replace(1), None);
        assert_eq!(slot.replace(2), Some(1));
        assert!(slot.is_occupied());
        assert_eq!(slot.try_take(), Some(2));
        assert_eq!(slot.try_take(), None);
    }

    #[tokio::test]
    async fn recv_returns_already_published_item() {
        let slot = LatestSlot::new();
        slot.replace("ready");
        assert_eq!(slot.recv().await, "ready");
        assert!(!slot.is_occupied());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn recv_wakes_on_publish() {
        let slot = Arc::new(LatestSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move { slot.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        slot.replace(7u32);

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
        assert_eq!(got, 7);
    }
}
