//! Faucet service core logic

use crate::config::FaucetConfig;
use crate::database::{IdentityRecord, IdentityStore};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::{FaucetError, FaucetResult, StoreError};
use crate::executor::{ChainClient, FundingOutcome, TransferExecutor};
use crate::identity::{
    subject_from_bearer, validate_callback, KycCallback, KycGateway, REQUIRED_PROOF_FIELDS,
};
use crate::limiter::RateLimitCache;
use crate::queue::DispatchQueue;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-facing result of a claim. `VerificationPending` is a legitimate
/// steady state, not an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// Funding sequence ran inline; both legs reported (partial failure is
    /// a valid terminal outcome).
    Funded(FundingOutcome),
    /// The dispatcher was busy; the beneficiary waits in the queue.
    Queued,
    /// Identity verification is still in progress.
    VerificationPending,
}

/// Faucet status summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetStatus {
    pub wallet_address: String,
    pub currency_amount: String,
    pub token_amount: String,
    pub queue_depth: usize,
    pub verified_identities: u64,
}

/// Faucet service: admission control, verification gating and dispatch.
pub struct FaucetService {
    config: FaucetConfig,
    store: Arc<dyn IdentityStore>,
    kyc: Arc<dyn KycGateway>,
    chain: Arc<dyn ChainClient>,
    limiter: RateLimitCache,
    dispatcher: Arc<Dispatcher>,
}

impl FaucetService {
    pub fn new(
        config: FaucetConfig,
        store: Arc<dyn IdentityStore>,
        kyc: Arc<dyn KycGateway>,
        chain: Arc<dyn ChainClient>,
    ) -> Self {
        let limiter = RateLimitCache::new(config.cooldown());
        let queue = Arc::new(DispatchQueue::new(config.queue_capacity));
        let executor = TransferExecutor::new(
            chain.clone(),
            config.currency_amount.clone(),
            config.token_amount.clone(),
        );
        let dispatcher = Arc::new(Dispatcher::new(queue, executor, config.request_timeout()));

        Self {
            config,
            store,
            kyc,
            chain,
            limiter,
            dispatcher,
        }
    }

    /// Dispatcher handle for spawning the background drain actor.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Unauthenticated claim: rate-limited by network origin only.
    pub async fn claim(&self, beneficiary: &str, origin: &str) -> FaucetResult<ClaimOutcome> {
        validate_beneficiary(beneficiary)?;

        info!(beneficiary, origin, "claim request");

        let keys = [origin];
        self.limiter.admit(&keys).await?;
        self.dispatch_with_rollback(beneficiary.to_string(), &keys)
            .await
    }

    /// Authenticated claim: the bearer subject names the identity, which
    /// must be verified before admission. Rate-limited by both network
    /// origin and identity address.
    pub async fn claim_identity(&self, bearer: &str, origin: &str) -> FaucetResult<ClaimOutcome> {
        let core_id = subject_from_bearer(bearer)?;

        info!(core_id = %core_id, origin, "authenticated claim request");

        match self.store.get(&core_id) {
            Err(StoreError::NotFound) => {
                self.begin_verification(&core_id).await?;
                Ok(ClaimOutcome::VerificationPending)
            }
            Ok(record) if !record.verified => Ok(ClaimOutcome::VerificationPending),
            Ok(_) => {
                let keys = [origin, core_id.as_str()];
                self.limiter.admit(&keys).await?;
                self.dispatch_with_rollback(core_id.clone(), &keys).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start the verification workflow for an unseen identity. The outbound
    /// request is issued before the record is persisted: a failed issuance
    /// leaves no record, and the caller retries the claim later.
    async fn begin_verification(&self, core_id: &str) -> FaucetResult<()> {
        let expiry = Utc::now().timestamp() + self.config.kyc_expiry_secs as i64;

        self.kyc
            .request_verification(
                core_id,
                &REQUIRED_PROOF_FIELDS,
                &self.config.kyc_callback_url,
                expiry,
            )
            .await?;

        match self.store.create(&IdentityRecord::new(core_id)) {
            Ok(()) => {
                info!(core_id, "verification started, record pending");
                Ok(())
            }
            // A racing claim created it first; the workflow is underway.
            Err(StoreError::AlreadyExists) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Inbound callback from the verification workflow. A valid payload
    /// flips the record to verified and funds the identity exactly as the
    /// synchronous path would, bypassing the rate-limit keys (the callback
    /// is trusted).
    pub async fn handle_callback(&self, callback: KycCallback) -> FaucetResult<()> {
        validate_callback(&callback)?;

        // The store's flip is atomic: the workflow may duplicate deliveries,
        // and only the caller that performed the false -> true transition
        // may fund the identity.
        let flipped = self.store.mark_verified(&callback.user).map_err(|e| match e {
            StoreError::NotFound => {
                FaucetError::CallbackRejected("unknown identity".to_string())
            }
            other => other.into(),
        })?;

        if !flipped {
            info!(core_id = %callback.user, "callback for already-verified identity ignored");
            return Ok(());
        }

        match self.dispatcher.submit(callback.user.clone()).await? {
            DispatchOutcome::Executed(outcome) => {
                if !outcome.is_success() {
                    warn!(
                        core_id = %callback.user,
                        report = %outcome.describe(),
                        "post-verification funding incomplete"
                    );
                }
            }
            DispatchOutcome::Queued => {
                info!(core_id = %callback.user, "post-verification funding queued");
            }
        }

        Ok(())
    }

    /// Faucet status summary.
    pub async fn status(&self) -> FaucetResult<FaucetStatus> {
        Ok(FaucetStatus {
            wallet_address: self.chain.sender_address().await?,
            currency_amount: self.config.currency_amount.clone(),
            token_amount: self.config.token_amount.clone(),
            queue_depth: self.dispatcher.queue().len().await,
            verified_identities: self.store.verified_count()?,
        })
    }

    /// Submit under the committed rate-limit keys. Any non-success outcome
    /// releases the keys so the caller can retry without waiting out the
    /// cooldown.
    async fn dispatch_with_rollback(
        &self,
        beneficiary: String,
        keys: &[&str],
    ) -> FaucetResult<ClaimOutcome> {
        match self.dispatcher.submit(beneficiary).await {
            Ok(DispatchOutcome::Executed(outcome)) => {
                if !outcome.is_success() {
                    self.limiter.release(keys);
                }
                if outcome.is_total_failure() {
                    return Err(FaucetError::TransferFailed(outcome.describe()));
                }
                Ok(ClaimOutcome::Funded(outcome))
            }
            Ok(DispatchOutcome::Queued) => Ok(ClaimOutcome::Queued),
            Err(e) => {
                self.limiter.release(keys);
                Err(e)
            }
        }
    }
}

fn validate_beneficiary(beneficiary: &str) -> FaucetResult<()> {
    let ok = (4..=64).contains(&beneficiary.len())
        && beneficiary.chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(())
    } else {
        Err(FaucetError::InvalidAddress(beneficiary.to_string()))
    }
}
