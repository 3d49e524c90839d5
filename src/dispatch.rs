//! Serialized dispatcher: one funding sequence at a time

use crate::error::{FaucetError, FaucetResult};
use crate::executor::{FundingOutcome, TransferExecutor};
use crate::queue::DispatchQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Hook invoked for every funding sequence that fails during a drain pass.
/// The dispatcher itself never retries or persists failures; a stricter
/// deployment can attach durability here.
pub type DrainFailureHook = Box<dyn Fn(&str, &FundingOutcome) + Send + Sync>;

/// Result of submitting a beneficiary on the request path.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The funding sequence ran inline; both legs are reported.
    Executed(FundingOutcome),
    /// The dispatcher was busy; the beneficiary waits in the queue.
    Queued,
}

/// Funnels all funding sequences through one exclusive lock. The funding
/// wallet has a single strictly ordered nonce, so transfers must never
/// interleave.
pub struct Dispatcher {
    queue: Arc<DispatchQueue>,
    executor: TransferExecutor,
    lock: Mutex<()>,
    sync_timeout: Duration,
    on_drain_failure: Option<DrainFailureHook>,
}

impl Dispatcher {
    pub fn new(queue: Arc<DispatchQueue>, executor: TransferExecutor, sync_timeout: Duration) -> Self {
        Self {
            queue,
            executor,
            lock: Mutex::new(()),
            sync_timeout,
            on_drain_failure: None,
        }
    }

    pub fn with_drain_failure_hook(mut self, hook: DrainFailureHook) -> Self {
        self.on_drain_failure = Some(hook);
        self
    }

    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    /// Request-path entry. Executes inline only when the queue is empty and
    /// the lock is free; otherwise appends to the queue. Never blocks on
    /// the lock.
    pub async fn submit(&self, beneficiary: String) -> FaucetResult<DispatchOutcome> {
        if self.queue.is_empty().await {
            if let Ok(_guard) = self.lock.try_lock() {
                debug!(beneficiary = %beneficiary, "executing inline under dispatcher lock");
                let outcome = tokio::time::timeout(
                    self.sync_timeout,
                    self.executor.dispense(&beneficiary),
                )
                .await
                .map_err(|_| {
                    FaucetError::TransferFailed(format!(
                        "timed out after {:?} waiting for transfers",
                        self.sync_timeout
                    ))
                })?;
                return Ok(DispatchOutcome::Executed(outcome));
            }
        }

        self.queue.enqueue(beneficiary).await?;
        Ok(DispatchOutcome::Queued)
    }

    /// One drain pass: take every currently-queued beneficiary and fund
    /// each sequentially under the lock. Entries arriving mid-pass wait for
    /// the next tick. Failed entries are logged and skipped, never retried.
    pub async fn drain_once(&self) {
        if self.queue.is_empty().await {
            return;
        }

        let _guard = self.lock.lock().await;
        let batch = self.queue.drain().await;
        if batch.is_empty() {
            return;
        }

        info!(entries = batch.len(), "draining dispatch queue");

        for beneficiary in batch {
            let outcome = self.executor.dispense(&beneficiary).await;
            if !outcome.is_success() {
                warn!(
                    beneficiary = %beneficiary,
                    report = %outcome.describe(),
                    "drained funding sequence failed"
                );
                if let Some(hook) = &self.on_drain_failure {
                    hook(&beneficiary, &outcome);
                }
            }
        }
    }

    /// Spawn the background drain actor, ticking at `interval`.
    pub fn spawn_drain(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.drain_once().await;
            }
        })
    }
}
