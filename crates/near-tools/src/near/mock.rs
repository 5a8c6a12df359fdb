//! Mock NEAR Client
//!
//! In-memory chain for demos and tests. Supports `nft_tokens`/`nft_mint` on
//! the client's own contract, faucet transfers and status lookups of
//! transactions it produced.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

use super::NearClient;
use crate::error::{NearError, Result};
use crate::model::{FaucetReceipt, TxOutcome, TxStatus, yocto_to_near};

#[derive(Default)]
struct Ledger {
    tokens: Vec<Value>,
    transactions: HashMap<String, Value>,
}

/// Mock NEAR client with an in-memory NFT contract
pub struct MockNearClient {
    account_id: String,
    ledger: Mutex<Ledger>,
}

impl Default for MockNearClient {
    fn default() -> Self {
        Self::new("nearaibot.testnet")
    }
}

impl MockNearClient {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Number of tokens minted so far
    pub fn minted(&self) -> usize {
        self.lock().tokens.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // A poisoned ledger is still consistent: every mutation is a single push/insert.
        self.ledger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, ledger: &mut Ledger, receiver: &str, method: &str) -> String {
        let hash = uuid::Uuid::new_v4().simple().to_string();
        ledger.transactions.insert(
            hash.clone(),
            json!({
                "status": { "SuccessValue": "" },
                "transaction": {
                    "hash": hash,
                    "signer_id": self.account_id,
                    "receiver_id": receiver,
                    "actions": [{ "FunctionCall": { "method_name": method } }],
                },
            }),
        );
        hash
    }
}

#[async_trait]
impl NearClient for MockNearClient {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn view_function(&self, contract: &str, method: &str, _args: Value) -> Result<Value> {
        match (contract == self.account_id, method) {
            (true, "nft_tokens") => Ok(Value::Array(self.lock().tokens.clone())),
            (true, "nft_total_supply") => Ok(json!(self.lock().tokens.len().to_string())),
            _ => Err(NearError::Rpc(format!(
                "MethodNotFound: {contract}::{method}"
            ))),
        }
    }

    async fn function_call(
        &self,
        contract: &str,
        method: &str,
        args: Value,
        deposit_yocto: u128,
    ) -> Result<TxOutcome> {
        if contract != self.account_id || method != "nft_mint" {
            return Err(NearError::Rpc(format!(
                "MethodNotFound: {contract}::{method}"
            )));
        }

        let mut ledger = self.lock();
        let token_id = args["token_id"].as_str().unwrap_or_default().to_string();
        if ledger.tokens.iter().any(|t| t["token_id"] == token_id) {
            let failure = json!({ "ActionError": { "kind": { "FunctionCallError": {
                "ExecutionError": format!("Smart contract panicked: token {token_id} already exists"),
            }}}});
            return Ok(TxOutcome {
                hash: uuid::Uuid::new_v4().simple().to_string(),
                status: TxStatus::Failure(failure),
            });
        }

        let receiver = args["receiver_id"].as_str().unwrap_or_default().to_string();
        ledger.tokens.push(json!({
            "token_id": token_id,
            "owner_id": receiver,
            "metadata": args["token_metadata"].clone(),
        }));
        let hash = self.record(&mut ledger, contract, method);
        tracing::debug!(%token_id, %receiver, deposit = %yocto_to_near(deposit_yocto), "Mock NFT minted");

        Ok(TxOutcome {
            hash,
            status: TxStatus::Success(String::new()),
        })
    }

    async fn tx_status(&self, tx_hash: &str, _sender_account: &str) -> Result<Value> {
        self.lock()
            .transactions
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| NearError::Rpc(format!("UNKNOWN_TRANSACTION: {tx_hash}")))
    }

    async fn request_faucet(&self, receiver: &str, amount_yocto: u128) -> Result<FaucetReceipt> {
        let mut ledger = self.lock();
        let tx_hash = self.record(&mut ledger, receiver, "transfer");
        Ok(FaucetReceipt {
            tx_hash,
            amount_yocto,
        })
    }

    fn name(&self) -> &str {
        "MockNear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mint_then_lookup() {
        let client = MockNearClient::default();
        let outcome = client
            .function_call(
                "nearaibot.testnet",
                "nft_mint",
                json!({"token_id": "0", "receiver_id": "alice.testnet"}),
                0,
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, TxStatus::Success(String::new()));
        assert_eq!(client.minted(), 1);

        let status = client.tx_status(&outcome.hash, "nearaibot.testnet").await.unwrap();
        assert_eq!(status["transaction"]["hash"], outcome.hash);
    }

    #[tokio::test]
    async fn test_duplicate_token_fails() {
        let client = MockNearClient::default();
        let args = json!({"token_id": "0", "receiver_id": "alice.testnet"});
        client.function_call("nearaibot.testnet", "nft_mint", args.clone(), 0).await.unwrap();

        let outcome = client
            .function_call("nearaibot.testnet", "nft_mint", args, 0)
            .await
            .unwrap();
        assert!(matches!(outcome.status, TxStatus::Failure(_)));
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let client = MockNearClient::default();
        assert!(client.tx_status("nope", "alice.testnet").await.is_err());
    }
}
