//! Shared mock collaborators for module tests

use crate::database::{IdentityRecord, IdentityStore};
use crate::error::{FaucetError, FaucetResult, StoreError};
use crate::executor::{ChainClient, Denomination};
use crate::identity::KycGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    pub beneficiary: String,
    pub amount: String,
    pub denom: Denomination,
}

/// Chain client recording every transfer. Tracks in-flight concurrency so
/// tests can assert funding sequences never interleave, and supports
/// per-denomination failure injection plus an artificial delay.
pub struct MockChainClient {
    calls: Mutex<Vec<RecordedTransfer>>,
    fail_currency: AtomicBool,
    fail_token: AtomicBool,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_concurrency: AtomicUsize,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_currency: AtomicBool::new(false),
            fail_token: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_concurrency: AtomicUsize::new(0),
        }
    }

    pub fn fail_currency(&self) {
        self.fail_currency.store(true, Ordering::SeqCst);
    }

    pub fn fail_token(&self) {
        self.fail_token.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<RecordedTransfer> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn sender_address(&self) -> FaucetResult<String> {
        Ok("cb00faucetwallet".to_string())
    }

    async fn transfer(
        &self,
        beneficiary: &str,
        amount: &str,
        denom: Denomination,
    ) -> FaucetResult<String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrency.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(RecordedTransfer {
            beneficiary: beneficiary.to_string(),
            amount: amount.to_string(),
            denom,
        });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let should_fail = match denom {
            Denomination::Currency => self.fail_currency.load(Ordering::SeqCst),
            Denomination::Token => self.fail_token.load(Ordering::SeqCst),
        };

        if should_fail {
            Err(FaucetError::TransferFailed(format!(
                "injected {:?} failure",
                denom
            )))
        } else {
            let seq = self.calls.lock().unwrap().len();
            Ok(format!("0xtx{:04}", seq))
        }
    }
}

/// In-memory identity store for service tests.
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, core_id: &str) -> Result<IdentityRecord, StoreError> {
        self.records
            .lock()
            .unwrap()
            .get(core_id)
            .filter(|r| !r.deleted)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn create(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.core_id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(record.core_id.clone(), record.clone());
        Ok(())
    }

    fn mark_verified(&self, core_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(core_id).ok_or(StoreError::NotFound)?;
        if record.verified {
            return Ok(false);
        }
        record.verified = true;
        Ok(true)
    }

    fn verified_count(&self) -> Result<u64, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.verified)
            .count() as u64)
    }
}

/// KYC gateway mock counting issued verification requests.
pub struct MockKycGateway {
    requests: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl MockKycGateway {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_identities(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl KycGateway for MockKycGateway {
    async fn request_verification(
        &self,
        identity: &str,
        fields: &[&str],
        _callback_url: &str,
        _expiry_unix: i64,
    ) -> FaucetResult<()> {
        assert_eq!(fields.len(), 12);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(FaucetError::Internal(
                "injected verification request failure".to_string(),
            ));
        }

        self.requests.lock().unwrap().push(identity.to_string());
        Ok(())
    }
}
