//! Sled-backed identity record store

use crate::error::StoreError;
use crate::identity::VerificationStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::sync::Arc;
use tracing::{debug, info};

/// Persisted record of a claimed identity undergoing verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Stable identity key (core address)
    pub core_id: String,
    /// Flips false -> true exactly once, via `mark_verified`
    pub verified: bool,
    /// Creation timestamp (unix seconds)
    pub created_at: i64,
    /// Last-update timestamp (unix seconds)
    pub updated_at: i64,
    /// Soft-deletion marker, owned by the store
    pub deleted: bool,
}

impl IdentityRecord {
    pub fn new(core_id: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            core_id: core_id.to_string(),
            verified: false,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    pub fn status(&self) -> VerificationStatus {
        if self.verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Pending
        }
    }
}

/// Narrow persistence interface for identity records. `NotFound` is a
/// distinct signal from backend failures.
pub trait IdentityStore: Send + Sync {
    fn get(&self, core_id: &str) -> Result<IdentityRecord, StoreError>;

    /// Create a fresh record; fails with `AlreadyExists` if the identity is
    /// already tracked.
    fn create(&self, record: &IdentityRecord) -> Result<(), StoreError>;

    /// Flip the verification flag. Returns `true` when this call performed
    /// the false -> true transition, `false` when the record was already
    /// verified. The check and the flip are atomic so concurrent callers
    /// cannot both observe the transition.
    fn mark_verified(&self, core_id: &str) -> Result<bool, StoreError>;

    fn verified_count(&self) -> Result<u64, StoreError>;
}

/// Default store backed by a sled tree.
pub struct SledIdentityStore {
    _db: Arc<Db>,
    identities: Tree,
}

impl SledIdentityStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        info!("Opening identity store at: {}", path);

        let db = sled::open(path)?;
        let identities = db.open_tree("identities")?;

        Ok(Self {
            _db: Arc::new(db),
            identities,
        })
    }

    fn decode(bytes: &[u8]) -> Result<IdentityRecord, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode(record: &IdentityRecord) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(record).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

impl IdentityStore for SledIdentityStore {
    fn get(&self, core_id: &str) -> Result<IdentityRecord, StoreError> {
        match self.identities.get(core_id.as_bytes())? {
            Some(bytes) => {
                let record = Self::decode(&bytes)?;
                if record.deleted {
                    Err(StoreError::NotFound)
                } else {
                    Ok(record)
                }
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn create(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let value = Self::encode(record)?;

        // Create-if-absent so two racing claims cannot both persist.
        match self.identities.compare_and_swap(
            record.core_id.as_bytes(),
            None as Option<&[u8]>,
            Some(value),
        )? {
            Ok(()) => {
                debug!(core_id = %record.core_id, "identity record created");
                Ok(())
            }
            Err(_) => Err(StoreError::AlreadyExists),
        }
    }

    fn mark_verified(&self, core_id: &str) -> Result<bool, StoreError> {
        // Compare-and-swap loop: exactly one caller wins the false -> true
        // transition, no matter how many race.
        loop {
            let current = self
                .identities
                .get(core_id.as_bytes())?
                .ok_or(StoreError::NotFound)?;

            let mut record = Self::decode(&current)?;
            if record.deleted {
                return Err(StoreError::NotFound);
            }
            if record.verified {
                return Ok(false);
            }

            record.verified = true;
            record.updated_at = Utc::now().timestamp();
            let value = Self::encode(&record)?;

            match self.identities.compare_and_swap(
                core_id.as_bytes(),
                Some(current),
                Some(value),
            )? {
                Ok(()) => {
                    info!(core_id, "identity marked verified");
                    return Ok(true);
                }
                // Lost the race; re-read and re-check.
                Err(_) => continue,
            }
        }
    }

    fn verified_count(&self) -> Result<u64, StoreError> {
        let mut count = 0u64;
        for item in self.identities.iter() {
            let (_, value) = item?;
            let record = Self::decode(&value)?;
            if record.verified && !record.deleted {
                count += 1;
            }
        }
        Ok(count)
    }
}
