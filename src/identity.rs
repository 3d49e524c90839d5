//! Identity verification: state machine, KYC gateway and callback validation

use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Proof fields a verification callback must supply, in this exact order.
pub const REQUIRED_PROOF_FIELDS: [&str; 12] = [
    "FullName",
    "DOB",
    "ExpiryDate",
    "IssueDate",
    "DocumentNumber",
    "Gender",
    "Country",
    "DocumentImage",
    "FaceImage",
    "AdditionalProof",
    "Email",
    "Phone",
];

/// Where an identity stands in the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// No record exists yet.
    Unknown,
    /// Record exists, external verification not yet confirmed.
    Pending,
    /// Verified; never leaves this state.
    Verified,
}

/// Outbound interface to the external verification workflow. The request is
/// fire-and-forget: the workflow answers later through the HTTP callback.
#[async_trait]
pub trait KycGateway: Send + Sync {
    async fn request_verification(
        &self,
        identity: &str,
        fields: &[&str],
        callback_url: &str,
        expiry_unix: i64,
    ) -> FaucetResult<()>;
}

/// Default gateway posting the verification request over HTTP. An empty
/// response body means accepted; a non-empty body is an error message.
pub struct HttpKycGateway {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpKycGateway {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: std::time::Duration) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaucetError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl KycGateway for HttpKycGateway {
    async fn request_verification(
        &self,
        identity: &str,
        fields: &[&str],
        callback_url: &str,
        expiry_unix: i64,
    ) -> FaucetResult<()> {
        let payload = serde_json::json!({
            "identity": identity,
            "fields": fields,
            "callback_url": callback_url,
            "expiry": expiry_unix,
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FaucetError::Internal(format!("verification request failed: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| FaucetError::Internal(format!("verification response: {}", e)))?;

        if body.trim().is_empty() {
            info!(identity, "verification request issued");
            Ok(())
        } else {
            Err(FaucetError::Internal(format!(
                "verification workflow rejected request: {}",
                body
            )))
        }
    }
}

/// Callback payload delivered by the verification workflow once the user
/// has submitted their documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycCallback {
    /// Identity key the verification belongs to.
    pub user: String,
    /// One entry per required proof field, in the fixed order.
    pub infos: Vec<serde_json::Map<String, Value>>,
}

/// Validate a callback against the fixed ordered field list. Entry i must
/// contain the key at position i; values may be empty but keys must be
/// present. Count or name mismatches reject the callback outright.
pub fn validate_callback(callback: &KycCallback) -> FaucetResult<()> {
    if callback.infos.len() != REQUIRED_PROOF_FIELDS.len() {
        return Err(FaucetError::CallbackRejected(format!(
            "expected {} proof entries, got {}",
            REQUIRED_PROOF_FIELDS.len(),
            callback.infos.len()
        )));
    }

    for (i, field) in REQUIRED_PROOF_FIELDS.iter().enumerate() {
        if !callback.infos[i].contains_key(*field) {
            return Err(FaucetError::CallbackRejected(format!(
                "proof entry {} does not carry field {}",
                i, field
            )));
        }
    }

    debug!(user = %callback.user, "verification callback validated");
    Ok(())
}

/// Extract the core identity address from a bearer credential whose subject
/// claim encodes `coreid:<address>`.
///
/// The token signature is NOT verified here; the claims are read as-is from
/// the payload segment. A gateway in front of the service is expected to
/// have authenticated the token.
pub fn subject_from_bearer(token: &str) -> FaucetResult<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| FaucetError::Unauthorized("malformed credential".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| FaucetError::Unauthorized("credential payload is not base64".to_string()))?;

    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|_| FaucetError::Unauthorized("credential payload is not JSON".to_string()))?;

    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .ok_or_else(|| FaucetError::Unauthorized("credential has no subject".to_string()))?;

    subject
        .strip_prefix("coreid:")
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FaucetError::Unauthorized("subject is not a core identity".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback_with_all_fields(user: &str) -> KycCallback {
        let infos = REQUIRED_PROOF_FIELDS
            .iter()
            .map(|field| {
                let mut entry = serde_json::Map::new();
                entry.insert(field.to_string(), Value::String("x".to_string()));
                entry
            })
            .collect();
        KycCallback {
            user: user.to_string(),
            infos,
        }
    }

    fn bearer_with_subject(sub: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}"}}"#, sub));
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn full_callback_is_accepted() {
        let cb = callback_with_all_fields("cb57abc");
        assert!(validate_callback(&cb).is_ok());
    }

    #[test]
    fn short_callback_is_rejected() {
        let mut cb = callback_with_all_fields("cb57abc");
        cb.infos.pop();
        assert_eq!(cb.infos.len(), 11);

        match validate_callback(&cb) {
            Err(FaucetError::CallbackRejected(msg)) => assert!(msg.contains("11")),
            other => panic!("expected CallbackRejected, got {:?}", other),
        }
    }

    #[test]
    fn misnamed_field_is_rejected() {
        let mut cb = callback_with_all_fields("cb57abc");
        // Fifth entry must carry DocumentNumber.
        cb.infos[4].clear();
        cb.infos[4].insert("SerialNumber".to_string(), Value::String("x".to_string()));

        match validate_callback(&cb) {
            Err(FaucetError::CallbackRejected(msg)) => {
                assert!(msg.contains("DocumentNumber"));
            }
            other => panic!("expected CallbackRejected, got {:?}", other),
        }
    }

    #[test]
    fn empty_values_are_allowed_when_keys_present() {
        let mut cb = callback_with_all_fields("cb57abc");
        cb.infos[9].insert(
            "AdditionalProof".to_string(),
            Value::String(String::new()),
        );
        assert!(validate_callback(&cb).is_ok());
    }

    #[test]
    fn subject_with_coreid_prefix_parses() {
        let token = bearer_with_subject("coreid:cb57deadbeef");
        assert_eq!(subject_from_bearer(&token).unwrap(), "cb57deadbeef");
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        let token = bearer_with_subject("user:cb57deadbeef");
        assert!(matches!(
            subject_from_bearer(&token),
            Err(FaucetError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(subject_from_bearer("nonsense").is_err());
        assert!(subject_from_bearer("a.!!!.c").is_err());
    }
}
