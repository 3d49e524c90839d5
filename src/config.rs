//! Faucet configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Server address
    pub server_addr: String,

    /// RPC endpoint for the blockchain node
    pub rpc_url: String,

    /// Funding wallet address (key is held by the node)
    pub wallet_address: String,

    /// Amount of XCB to dispense per request (in ore)
    pub currency_amount: String,

    /// Amount of CTN to dispense per request
    pub token_amount: String,

    /// Cooldown between requests for the same origin or identity (minutes).
    /// Zero or negative disables rate limiting.
    pub cooldown_mins: i64,

    /// Dispatch queue capacity
    pub queue_capacity: usize,

    /// Background drain interval (seconds)
    pub drain_interval_secs: u64,

    /// Deadline for the synchronous dispatch path (seconds)
    pub request_timeout_secs: u64,

    /// Per-call timeout for RPC and KYC requests (seconds)
    pub rpc_timeout_secs: u64,

    /// KYC workflow endpoint
    pub kyc_endpoint: String,

    /// KYC workflow API key
    pub kyc_api_key: Option<String>,

    /// Callback URL handed to the KYC workflow
    pub kyc_callback_url: String,

    /// Validity window for an issued verification request (seconds)
    pub kyc_expiry_secs: u64,

    /// Database path
    pub db_path: String,

    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            wallet_address: String::new(),
            currency_amount: "10000000000000000000".to_string(), // 10 XCB
            token_amount: "100".to_string(),
            cooldown_mins: 1440, // 24 hours
            queue_capacity: 100,
            drain_interval_secs: 1,
            request_timeout_secs: 5,
            rpc_timeout_secs: 10,
            kyc_endpoint: "http://localhost:9000/verify".to_string(),
            kyc_api_key: None,
            kyc_callback_url: "http://localhost:3000/kyc/callback".to_string(),
            kyc_expiry_secs: 3600,
            db_path: "./faucet_data".to_string(),
            cors_enabled: true,
        }
    }
}

impl FaucetConfig {
    /// Load from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FAUCET_SERVER_ADDR") {
            config.server_addr = addr;
        }

        if let Ok(rpc_url) = std::env::var("FAUCET_RPC_URL") {
            config.rpc_url = rpc_url;
        }

        if let Ok(wallet) = std::env::var("FAUCET_WALLET_ADDRESS") {
            config.wallet_address = wallet;
        }

        if let Ok(amount) = std::env::var("FAUCET_CURRENCY_AMOUNT") {
            config.currency_amount = amount;
        }

        if let Ok(amount) = std::env::var("FAUCET_TOKEN_AMOUNT") {
            config.token_amount = amount;
        }

        if let Ok(mins) = std::env::var("FAUCET_COOLDOWN_MINS") {
            config.cooldown_mins = mins.parse().unwrap_or(config.cooldown_mins);
        }

        if let Ok(cap) = std::env::var("FAUCET_QUEUE_CAPACITY") {
            config.queue_capacity = cap.parse().unwrap_or(config.queue_capacity);
        }

        if let Ok(secs) = std::env::var("FAUCET_DRAIN_INTERVAL") {
            config.drain_interval_secs = secs.parse().unwrap_or(config.drain_interval_secs);
        }

        if let Ok(secs) = std::env::var("FAUCET_REQUEST_TIMEOUT") {
            config.request_timeout_secs = secs.parse().unwrap_or(config.request_timeout_secs);
        }

        if let Ok(secs) = std::env::var("FAUCET_RPC_TIMEOUT") {
            config.rpc_timeout_secs = secs.parse().unwrap_or(config.rpc_timeout_secs);
        }

        if let Ok(secs) = std::env::var("FAUCET_KYC_EXPIRY") {
            config.kyc_expiry_secs = secs.parse().unwrap_or(config.kyc_expiry_secs);
        }

        if let Ok(endpoint) = std::env::var("FAUCET_KYC_ENDPOINT") {
            config.kyc_endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("FAUCET_KYC_API_KEY") {
            config.kyc_api_key = Some(key);
        }

        if let Ok(url) = std::env::var("FAUCET_KYC_CALLBACK_URL") {
            config.kyc_callback_url = url;
        }

        if let Ok(db_path) = std::env::var("FAUCET_DB_PATH") {
            config.db_path = db_path;
        }

        config
    }

    /// Cooldown applied to rate-limit entries. `None` disables limiting.
    pub fn cooldown(&self) -> Option<Duration> {
        if self.cooldown_mins <= 0 {
            None
        } else {
            Some(Duration::from_secs(self.cooldown_mins as u64 * 60))
        }
    }

    /// Background drain period
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs.max(1))
    }

    /// Deadline for the synchronous dispatch path
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Per-call timeout for outbound HTTP
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}
