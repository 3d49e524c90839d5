//! HTTP API for the faucet service

use crate::error::FaucetResult;
use crate::identity::KycCallback;
use crate::service::{ClaimOutcome, FaucetService, FaucetStatus};
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Claim form body
#[derive(Debug, Deserialize)]
pub struct ClaimForm {
    pub address: String,
}

fn claim_response(outcome: ClaimOutcome) -> Response {
    match outcome {
        ClaimOutcome::Funded(outcome) => (StatusCode::OK, outcome.describe()).into_response(),
        ClaimOutcome::Queued => (StatusCode::OK, "added to dispatch queue").into_response(),
        ClaimOutcome::VerificationPending => {
            (StatusCode::OK, "identity verification in progress").into_response()
        }
    }
}

/// Unauthenticated claim: beneficiary address as form data, rate-limited by
/// network origin.
pub async fn claim_handler(
    State(service): State<Arc<FaucetService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Form(form): Form<ClaimForm>,
) -> Response {
    info!(origin = %addr, address = %form.address, "claim request received");

    match service.claim(&form.address, &addr.ip().to_string()).await {
        Ok(outcome) => claim_response(outcome),
        Err(e) => {
            error!(error = %e, "claim failed");
            e.into_response()
        }
    }
}

/// Authenticated claim: the bearer credential's subject names the identity
/// to fund. Malformed credentials are rejected before any admission logic.
pub async fn claim_coreid_handler(
    State(service): State<Arc<FaucetService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if bearer.is_empty() {
        return (StatusCode::UNAUTHORIZED, "missing bearer credential").into_response();
    }

    match service.claim_identity(bearer, &addr.ip().to_string()).await {
        Ok(outcome) => claim_response(outcome),
        Err(e) => {
            error!(error = %e, "authenticated claim failed");
            e.into_response()
        }
    }
}

/// Inbound callback from the verification workflow.
pub async fn kyc_callback_handler(
    State(service): State<Arc<FaucetService>>,
    Json(callback): Json<KycCallback>,
) -> Response {
    info!(user = %callback.user, "verification callback received");

    match service.handle_callback(callback).await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            error!(error = %e, "verification callback failed");
            e.into_response()
        }
    }
}

/// Status handler
pub async fn status_handler(
    State(service): State<Arc<FaucetService>>,
) -> FaucetResult<Json<FaucetStatus>> {
    Ok(Json(service.status().await?))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with info
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Core Faucet",
        "version": "0.1.0",
        "description": "Dispenses XCB and CTN to development accounts",
        "endpoints": {
            "POST /claim": "Request funds for an address",
            "POST /claim/coreid": "Request funds for a verified identity",
            "POST /kyc/callback": "Verification workflow callback",
            "GET /status": "Faucet status",
            "GET /health": "Health check"
        }
    }))
}
