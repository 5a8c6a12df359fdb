//! NEAR Integration
//!
//! Abstractions and implementations for talking to a NEAR network.

mod mock;
mod rpc;

pub use mock::MockNearClient;
pub use rpc::RpcNearClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::{FaucetReceipt, TxOutcome};

/// NEAR client trait (Strategy pattern)
///
/// Implementations must not leave half-applied side effects behind if the
/// calling future is dropped; the agent does not roll anything back.
#[async_trait]
pub trait NearClient: Send + Sync {
    /// Account the client acts as
    fn account_id(&self) -> &str;

    /// Call a view method and decode its JSON result
    async fn view_function(&self, contract: &str, method: &str, args: Value) -> Result<Value>;

    /// Whether `function_call` can sign transactions at all
    fn can_sign(&self) -> bool {
        true
    }

    /// Submit a signed function call transaction
    async fn function_call(
        &self,
        contract: &str,
        method: &str,
        args: Value,
        deposit_yocto: u128,
    ) -> Result<TxOutcome>;

    /// Full transaction status as returned by `EXPERIMENTAL_tx_status`
    async fn tx_status(&self, tx_hash: &str, sender_account: &str) -> Result<Value>;

    /// Ask the testnet faucet to send tokens to `receiver`
    async fn request_faucet(&self, receiver: &str, amount_yocto: u128) -> Result<FaucetReceipt>;

    /// Client name
    fn name(&self) -> &str;
}
