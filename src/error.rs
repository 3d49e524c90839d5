//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Identity store errors. `NotFound` is a distinct signal the service
/// handles on the claim path; everything else is surfaced as internal.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity not found")]
    NotFound,

    #[error("identity already exists")]
    AlreadyExists,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("record encoding error: {0}")]
    Codec(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Rate limit exceeded: try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Dispatch queue is full")]
    QueueFull,

    #[error("Invalid beneficiary address: {0}")]
    InvalidAddress(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Verification callback rejected: {0}")]
    CallbackRejected(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            FaucetError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "Rate limit exceeded. Try again in {} seconds",
                    retry_after_secs
                ),
            ),
            FaucetError::QueueFull => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Dispatch queue is full. Please try again later.".to_string(),
            ),
            FaucetError::InvalidAddress(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid beneficiary address: {}", msg),
            ),
            FaucetError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, format!("Unauthorized: {}", msg))
            }
            FaucetError::CallbackRejected(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Verification callback rejected: {}", msg),
            ),
            FaucetError::TransferFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Transfer failed: {}", msg),
            ),
            FaucetError::Storage(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", err),
            ),
            FaucetError::Rpc(msg) => (StatusCode::BAD_GATEWAY, format!("RPC error: {}", msg)),
            FaucetError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        };

        (status, message).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
