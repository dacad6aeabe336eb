//! Coalescing notifications used to request a reconciliation pass.
//!
//! Watchers call [`Trigger::fire()`] for every change they observe. Any number of
//! fires that happen while nobody is waiting collapse into a single wakeup, so a burst
//! of node events results in one pass instead of many.

use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Clone, Default)]
pub struct Trigger {
    notify: Arc<Notify>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a pass. Never blocks
    pub fn fire(&self) {
        self.notify.notify_one();
    }

    /// Wait until at least one pass was requested since the last wakeup
    pub async fn fired(&self) {
        self.notify.notified().await;
    }
}
