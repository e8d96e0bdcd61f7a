use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

/// Announces that the map view has finished drawing a given route
/// generation (route resolved, tiles loaded). Export waits on it before
/// capturing.
#[derive(Clone)]
pub struct SettleSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl SettleSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Generations only move forward; older marks are ignored.
    pub fn mark_settled(&self, generation: u64) -> bool {
        self.tx.send_if_modified(|current| {
            if generation > *current {
                *current = generation;
                true
            } else {
                false
            }
        })
    }

    pub fn settled_generation(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn is_settled(&self, generation: u64) -> bool {
        self.settled_generation() >= generation
    }

    /// Returns false if `generation` did not settle within `timeout`.
    pub async fn wait_for(&self, generation: u64, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let settled = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|settled| *settled >= generation)).await,
            Ok(Ok(_))
        );
        settled
    }
}

impl Default for SettleSignal {
    fn default() -> Self {
        Self::new()
    }
}
