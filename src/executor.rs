//! Transfer executor: the paired XCB + CTN funding sequence

use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Denomination of a single transfer within a funding sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denomination {
    Currency,
    Token,
}

/// Narrow interface to the collaborator that builds, signs and broadcasts
/// transactions. It assigns the funding wallet's nonce per call, which is
/// why calls must stay serialized under the dispatcher lock.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn sender_address(&self) -> FaucetResult<String>;

    async fn transfer(
        &self,
        beneficiary: &str,
        amount: &str,
        denom: Denomination,
    ) -> FaucetResult<String>;
}

/// Combined result of one funding sequence. A partial failure (one leg
/// succeeds, the other fails) is a valid terminal outcome and both legs
/// are always reported separately.
#[derive(Debug)]
pub struct FundingOutcome {
    pub beneficiary: String,
    pub currency: FaucetResult<String>,
    pub token: FaucetResult<String>,
}

impl FundingOutcome {
    pub fn is_success(&self) -> bool {
        self.currency.is_ok() && self.token.is_ok()
    }

    pub fn is_total_failure(&self) -> bool {
        self.currency.is_err() && self.token.is_err()
    }

    /// Human-readable report listing both legs.
    pub fn describe(&self) -> String {
        let currency = match &self.currency {
            Ok(tx) => format!("currency tx: {}", tx),
            Err(e) => format!("currency transfer failed: {}", e),
        };
        let token = match &self.token {
            Ok(tx) => format!("token tx: {}", tx),
            Err(e) => format!("token transfer failed: {}", e),
        };
        format!("{}\n{}", currency, token)
    }
}

/// Runs funding sequences. Callers must hold the dispatcher lock; the
/// executor itself does no locking.
pub struct TransferExecutor {
    client: Arc<dyn ChainClient>,
    currency_amount: String,
    token_amount: String,
}

impl TransferExecutor {
    pub fn new(client: Arc<dyn ChainClient>, currency_amount: String, token_amount: String) -> Self {
        Self {
            client,
            currency_amount,
            token_amount,
        }
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Execute one funding sequence: currency first, then token. The second
    /// leg is attempted even if the first fails; both results are reported.
    pub async fn dispense(&self, beneficiary: &str) -> FundingOutcome {
        let currency = self
            .client
            .transfer(beneficiary, &self.currency_amount, Denomination::Currency)
            .await;

        if let Err(e) = &currency {
            warn!(beneficiary, error = %e, "currency transfer failed");
        }

        let token = self
            .client
            .transfer(beneficiary, &self.token_amount, Denomination::Token)
            .await;

        if let Err(e) = &token {
            warn!(beneficiary, error = %e, "token transfer failed");
        }

        if currency.is_ok() && token.is_ok() {
            info!(beneficiary, "funding sequence complete");
        }

        FundingOutcome {
            beneficiary: beneficiary.to_string(),
            currency,
            token,
        }
    }
}
