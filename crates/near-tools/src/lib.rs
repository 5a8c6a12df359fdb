//! # near-tools
//!
//! NEAR testnet tools for the agent: funding accounts from the faucet,
//! minting NFTs from the agent's own contract and looking up transactions.
//!
//! ## Tools
//!
//! ```text
//! ┌───────────────────────────┬───────────────────────────┬──────────────┐
//! │ name                      │ parameters                │ side effects │
//! ├───────────────────────────┼───────────────────────────┼──────────────┤
//! │ get_testnet_tokens        │ receiver                  │ yes          │
//! │ mint_near_nft             │ receiver                  │ yes          │
//! │ get_near_transaction_info │ tx_hash, sender_account   │ no           │
//! └───────────────────────────┴───────────────────────────┴──────────────┘
//! ```
//!
//! All tools talk to the chain through a [`near::NearClient`]; use
//! [`near::MockNearClient`] for demos and tests.

pub mod error;
pub mod model;
pub mod near;
pub mod svckit;

use std::sync::Arc;

use agent_core::ToolRegistry;

pub use error::{NearError, Result};
pub use model::{FaucetReceipt, NftMetadata, TxOutcome, TxStatus};
pub use near::{MockNearClient, NearClient, RpcNearClient};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{GetTestnetTokensTool, MintNftTool, TransactionInfoTool};
}

/// Register every NEAR tool against one client
pub fn register_near_tools(registry: &mut ToolRegistry, client: Arc<dyn NearClient>) {
    tracing::debug!(client = client.name(), account = client.account_id(), "Registering NEAR tools");
    registry.register(tools::GetTestnetTokensTool::new(client.clone()));
    registry.register(tools::MintNftTool::new(client.clone()));
    registry.register(tools::TransactionInfoTool::new(client));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_near_tools() {
        let mut registry = ToolRegistry::new();
        register_near_tools(&mut registry, Arc::new(MockNearClient::default()));

        assert_eq!(
            registry.names(),
            vec!["get_near_transaction_info", "get_testnet_tokens", "mint_near_nft"]
        );
    }

    #[tokio::test]
    async fn test_registry_rejects_missing_receiver() {
        let mut registry = ToolRegistry::new();
        register_near_tools(&mut registry, Arc::new(MockNearClient::default()));

        let call = agent_core::ToolCall::new("mint_near_nft", serde_json::Map::new());
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, agent_core::AgentError::ToolValidation(_)));
    }
}
