//! NFT Minting Tool
//!
//! Mints a token on the agent's own NFT contract and sends it to a receiver.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::error::NearError;
use crate::model::{NftMetadata, TxStatus, near_to_yocto, validate_account_id};
use crate::near::NearClient;

/// Storage deposit attached to every mint
pub const MINT_DEPOSIT_NEAR: Decimal = dec!(0.1);

/// Tool for minting NFTs
pub struct MintNftTool {
    client: Arc<dyn NearClient>,
    metadata: NftMetadata,
}

impl MintNftTool {
    pub fn new(client: Arc<dyn NearClient>) -> Self {
        Self {
            client,
            metadata: NftMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: NftMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[async_trait]
impl Tool for MintNftTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "mint_near_nft".into(),
            description: "Create an NFT and send it to a Near account. Returns a string explaining what happened.".into(),
            parameters: vec![ParameterSchema::required(
                "receiver",
                "string",
                "The receiver of the NFT",
            )],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let receiver = call.str_arg("receiver")?;
        validate_account_id(receiver)?;
        if !self.client.can_sign() {
            return Err(NearError::SigningUnavailable(self.client.account_id().to_string()).into());
        }

        let contract = self.client.account_id().to_string();
        let existing = self
            .client
            .view_function(&contract, "nft_tokens", json!({}))
            .await?;
        let token_id = existing.as_array().map_or(0, Vec::len).to_string();

        tracing::info!(%receiver, %token_id, "Minting NFT");
        let outcome = self
            .client
            .function_call(
                &contract,
                "nft_mint",
                json!({
                    "token_id": token_id,
                    "receiver_id": receiver,
                    "token_metadata": self.metadata,
                }),
                near_to_yocto(MINT_DEPOSIT_NEAR)?,
            )
            .await?;

        let output = match outcome.status {
            TxStatus::Success(_) => format!(
                "Successfully minted and sent NFT with transaction hash {}",
                outcome.hash
            ),
            TxStatus::Failure(failure) => format!("An error occurred: {failure}"),
            TxStatus::Unknown => "An unknown error occurred".to_string(),
        };

        Ok(ToolResult::success("mint_near_nft", output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::{MockNearClient, RpcNearClient};
    use agent_core::AgentError;

    fn call(receiver: &str) -> ToolCall {
        let mut arguments = serde_json::Map::new();
        arguments.insert("receiver".into(), json!(receiver));
        ToolCall::new("mint_near_nft", arguments)
    }

    #[tokio::test]
    async fn test_mints_incrementing_ids() {
        let client = Arc::new(MockNearClient::default());
        let tool = MintNftTool::new(client.clone());

        let first = tool.execute(&call("alice.testnet")).await.unwrap();
        let second = tool.execute(&call("bob.testnet")).await.unwrap();

        assert!(first.output.starts_with("Successfully minted and sent NFT"));
        assert!(second.output.starts_with("Successfully minted and sent NFT"));
        assert_eq!(client.minted(), 2);

        let tokens = client
            .view_function("nearaibot.testnet", "nft_tokens", json!({}))
            .await
            .unwrap();
        assert_eq!(tokens[1]["token_id"], "1");
        assert_eq!(tokens[1]["owner_id"], "bob.testnet");
        assert_eq!(tokens[0]["metadata"]["title"], "AI minted NFT");
    }

    #[tokio::test]
    async fn test_unsigned_client_fails_before_any_rpc() {
        // Nothing listens on the discard port; reaching the network would surface a Network error.
        let client = Arc::new(RpcNearClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            "bot.testnet",
        ));
        let err = MintNftTool::new(client)
            .execute(&call("alice.testnet"))
            .await
            .unwrap_err();

        match err {
            AgentError::ToolExecution(msg) => {
                assert!(msg.contains("require a signer"));
                assert!(!msg.contains("Network error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
