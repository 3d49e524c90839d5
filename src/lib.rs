//! Core Faucet Service
//!
//! Dispenses a fixed amount of XCB and CTN to development accounts with:
//! - Rate limiting (network origin and identity-based)
//! - Identity verification gating on the authenticated path
//! - A bounded dispatch queue drained by a background actor
//! - Serialized transfers from the single funding wallet

pub mod api;
pub mod client;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod identity;
pub mod limiter;
pub mod queue;
pub mod service;

#[cfg(test)]
pub mod testutil;

pub use client::JsonRpcChainClient;
pub use config::FaucetConfig;
pub use database::{IdentityRecord, IdentityStore, SledIdentityStore};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{FaucetError, FaucetResult, StoreError};
pub use executor::{ChainClient, Denomination, FundingOutcome, TransferExecutor};
pub use identity::{HttpKycGateway, KycCallback, KycGateway, VerificationStatus};
pub use limiter::RateLimitCache;
pub use queue::DispatchQueue;
pub use service::{ClaimOutcome, FaucetService, FaucetStatus};
