//! JSON-RPC NEAR Client
//!
//! Read-only RPC access plus the public testnet faucet. It holds no keys, so
//! `function_call` fails with `SigningUnavailable`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};

use super::NearClient;
use crate::error::{NearError, Result};
use crate::model::{FaucetReceipt, TxOutcome};

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct FaucetResponse {
    #[serde(default)]
    txh: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// NEAR JSON-RPC client
pub struct RpcNearClient {
    http: reqwest::Client,
    rpc_url: String,
    faucet_url: String,
    account_id: String,
}

impl RpcNearClient {
    pub fn new(
        rpc_url: impl Into<String>,
        faucet_url: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            faucet_url: faucet_url.into(),
            account_id: account_id.into(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(NearError::Rpc(error.to_string())),
            (Some(result), None) => Ok(result),
            (None, None) => Err(NearError::Rpc(format!("{method}: empty response"))),
        }
    }

    fn view_params(contract: &str, method: &str, args: &Value) -> Result<Value> {
        Ok(json!({
            "request_type": "call_function",
            "finality": "final",
            "account_id": contract,
            "method_name": method,
            "args_base64": BASE64.encode(serde_json::to_vec(args)?),
        }))
    }

    /// View results come back as a byte array holding JSON
    fn decode_view_result(result: &Value) -> Result<Value> {
        let bytes: Vec<u8> = serde_json::from_value(
            result
                .get("result")
                .cloned()
                .ok_or_else(|| NearError::Rpc("view call returned no result bytes".into()))?,
        )?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl NearClient for RpcNearClient {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn can_sign(&self) -> bool {
        false
    }

    async fn view_function(&self, contract: &str, method: &str, args: Value) -> Result<Value> {
        let result = self
            .call("query", Self::view_params(contract, method, &args)?)
            .await?;
        Self::decode_view_result(&result)
    }

    async fn function_call(
        &self,
        _contract: &str,
        _method: &str,
        _args: Value,
        _deposit_yocto: u128,
    ) -> Result<TxOutcome> {
        Err(NearError::SigningUnavailable(self.account_id.clone()))
    }

    async fn tx_status(&self, tx_hash: &str, sender_account: &str) -> Result<Value> {
        self.call("EXPERIMENTAL_tx_status", json!([tx_hash, sender_account]))
            .await
    }

    async fn request_faucet(&self, receiver: &str, amount_yocto: u128) -> Result<FaucetReceipt> {
        let response: FaucetResponse = self
            .http
            .post(&self.faucet_url)
            .json(&json!({
                "contractId": "near_faucet",
                "receiverId": receiver,
                "amount": amount_yocto.to_string(),
            }))
            .send()
            .await?
            .json()
            .await?;

        match (response.txh, response.error) {
            (_, Some(error)) => Err(NearError::Faucet(
                error.as_str().map_or_else(|| error.to_string(), str::to_string),
            )),
            (Some(tx_hash), None) => Ok(FaucetReceipt {
                tx_hash,
                amount_yocto,
            }),
            (None, None) => Err(NearError::Faucet("no transaction hash returned".into())),
        }
    }

    fn name(&self) -> &str {
        "NearRpc"
    }
}
