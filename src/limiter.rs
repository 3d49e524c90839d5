//! Admission control: keyed cooldown cache for network origins and identities

use crate::error::{FaucetError, FaucetResult};
use moka::sync::Cache;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Keyed time-window cache. A key's presence denies further requests for it
/// until the cooldown expires or the entry is released early.
///
/// Admission checks and commits for a set of keys happen under one internal
/// mutex so two concurrent requests sharing a key cannot both be admitted.
pub struct RateLimitCache {
    cooldown: Option<Duration>,
    entries: Cache<String, Instant>,
    gate: Mutex<()>,
}

impl RateLimitCache {
    /// Create a cache with the given cooldown. `None` disables limiting.
    pub fn new(cooldown: Option<Duration>) -> Self {
        let ttl = cooldown.unwrap_or(Duration::from_secs(1));
        let entries = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();

        Self {
            cooldown,
            entries,
            gate: Mutex::new(()),
        }
    }

    /// Check every key and, if all are free, commit them with the cooldown
    /// TTL. Denies with the remaining cooldown of the first committed key.
    pub async fn admit(&self, keys: &[&str]) -> FaucetResult<()> {
        let Some(cooldown) = self.cooldown else {
            return Ok(());
        };

        let _gate = self.gate.lock().await;

        for key in keys {
            if let Some(inserted_at) = self.entries.get(*key) {
                let remaining = cooldown.saturating_sub(inserted_at.elapsed());
                debug!(key = *key, remaining_secs = remaining.as_secs(), "admission denied");
                return Err(FaucetError::RateLimited {
                    retry_after_secs: remaining.as_secs().max(1),
                });
            }
        }

        let now = Instant::now();
        for key in keys {
            self.entries.insert(key.to_string(), now);
        }

        Ok(())
    }

    /// Drop committed entries early so a caller whose request ultimately
    /// failed downstream can retry without waiting out the cooldown.
    pub fn release(&self, keys: &[&str]) {
        if self.cooldown.is_none() {
            return;
        }
        for key in keys {
            self.entries.invalidate(*key);
        }
        debug!(?keys, "released rate-limit entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_then_denies_within_window() {
        let cache = RateLimitCache::new(Some(Duration::from_secs(60)));

        assert!(cache.admit(&["10.0.0.1"]).await.is_ok());

        match cache.admit(&["10.0.0.1"]).await {
            Err(FaucetError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs >= 1 && retry_after_secs <= 60);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn admits_again_after_ttl_elapses() {
        let cache = RateLimitCache::new(Some(Duration::from_millis(50)));

        assert!(cache.admit(&["10.0.0.2"]).await.is_ok());
        assert!(cache.admit(&["10.0.0.2"]).await.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.admit(&["10.0.0.2"]).await.is_ok());
    }

    #[tokio::test]
    async fn pair_admission_requires_both_keys_free() {
        let cache = RateLimitCache::new(Some(Duration::from_secs(60)));

        assert!(cache.admit(&["10.0.0.3", "cb57identity"]).await.is_ok());

        // Either key alone is enough to deny.
        assert!(cache.admit(&["10.0.0.9", "cb57identity"]).await.is_err());
        assert!(cache.admit(&["10.0.0.3", "cb99other"]).await.is_err());
    }

    #[tokio::test]
    async fn denied_pair_commits_nothing() {
        let cache = RateLimitCache::new(Some(Duration::from_secs(60)));

        assert!(cache.admit(&["10.0.0.4"]).await.is_ok());
        // First key is committed, so the pair is denied and the second key
        // must remain free for other callers.
        assert!(cache.admit(&["10.0.0.4", "cb42fresh"]).await.is_err());
        assert!(cache.admit(&["cb42fresh"]).await.is_ok());
    }

    #[tokio::test]
    async fn release_allows_immediate_retry() {
        let cache = RateLimitCache::new(Some(Duration::from_secs(60)));

        assert!(cache.admit(&["10.0.0.5"]).await.is_ok());
        cache.release(&["10.0.0.5"]);
        assert!(cache.admit(&["10.0.0.5"]).await.is_ok());
    }

    #[tokio::test]
    async fn disabled_cooldown_always_admits() {
        let cache = RateLimitCache::new(None);

        for _ in 0..3 {
            assert!(cache.admit(&["10.0.0.6"]).await.is_ok());
        }
    }
}
