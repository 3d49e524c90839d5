//! Bounded FIFO queue of beneficiaries awaiting funding

use crate::error::{FaucetError, FaucetResult};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// Bounded buffer of pending beneficiary addresses. Many request handlers
/// produce; only the dispatcher drains. Duplicates are allowed and are
/// processed as separate funding events.
pub struct DispatchQueue {
    capacity: usize,
    inner: Mutex<VecDeque<String>>,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a beneficiary. Non-blocking: a full queue rejects immediately
    /// so the caller can surface backpressure instead of dropping silently.
    pub async fn enqueue(&self, beneficiary: String) -> FaucetResult<()> {
        let mut queue = self.inner.lock().await;
        if queue.len() >= self.capacity {
            return Err(FaucetError::QueueFull);
        }
        queue.push_back(beneficiary);
        debug!(depth = queue.len(), "beneficiary queued");
        Ok(())
    }

    /// Take every currently-queued beneficiary in insertion order. Entries
    /// enqueued after this call are left for the next drain pass.
    pub async fn drain(&self) -> Vec<String> {
        let mut queue = self.inner.lock().await;
        queue.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
