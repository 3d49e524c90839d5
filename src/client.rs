//! JSON-RPC client for the blockchain node

use crate::error::{FaucetError, FaucetResult};
use crate::executor::{ChainClient, Denomination};
use async_trait::async_trait;
use tracing::{debug, info};

/// RPC client talking to a node that holds the funding wallet key. The node
/// builds, signs and broadcasts each transfer and assigns the wallet nonce,
/// so callers must keep transfers serialized.
pub struct JsonRpcChainClient {
    rpc_url: String,
    wallet_address: String,
    client: reqwest::Client,
}

impl JsonRpcChainClient {
    pub fn new(
        rpc_url: String,
        wallet_address: String,
        timeout: std::time::Duration,
    ) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaucetError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            rpc_url,
            wallet_address,
            client,
        })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> FaucetResult<serde_json::Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!(method, "RPC call");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FaucetError::Rpc(format!("request failed: {}", e)))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FaucetError::Rpc(format!("invalid response: {}", e)))?;

        if let Some(error) = json.get("error") {
            return Err(FaucetError::Rpc(error.to_string()));
        }

        Ok(json
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn sender_address(&self) -> FaucetResult<String> {
        Ok(self.wallet_address.clone())
    }

    async fn transfer(
        &self,
        beneficiary: &str,
        amount: &str,
        denom: Denomination,
    ) -> FaucetResult<String> {
        let method = match denom {
            Denomination::Currency => "xcb_sendTransaction",
            Denomination::Token => "ctn_sendTransaction",
        };

        let params = serde_json::json!([{
            "from": self.wallet_address,
            "to": beneficiary,
            "value": amount,
        }]);

        let result = self.call(method, params).await?;
        let tx_id = result.as_str().unwrap_or("").to_string();

        if tx_id.is_empty() {
            return Err(FaucetError::TransferFailed(
                "node returned an empty transaction id".to_string(),
            ));
        }

        info!(beneficiary, tx_id = %tx_id, ?denom, "transfer broadcast");
        Ok(tx_id)
    }
}
