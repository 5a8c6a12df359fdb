//! Testnet Faucet Tool
//!
//! Sends testnet NEAR to an account through the public faucet.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::error::NearError;
use crate::model::{near_to_yocto, validate_account_id};
use crate::near::NearClient;

/// Amount requested from the faucet per call
pub const FAUCET_AMOUNT_NEAR: Decimal = dec!(10);

/// Tool for funding testnet accounts
pub struct GetTestnetTokensTool {
    client: Arc<dyn NearClient>,
}

impl GetTestnetTokensTool {
    pub fn new(client: Arc<dyn NearClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetTestnetTokensTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_testnet_tokens".into(),
            description: "Send some Near testnet tokens to a Near account. Returns a string explaining what happened.".into(),
            parameters: vec![ParameterSchema::required(
                "receiver",
                "string",
                "The receiver of the tokens",
            )],
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let receiver = call.str_arg("receiver")?;
        validate_account_id(receiver)?;

        let amount = near_to_yocto(FAUCET_AMOUNT_NEAR)?;
        tracing::info!(%receiver, "Requesting testnet tokens");

        match self.client.request_faucet(receiver, amount).await {
            Ok(receipt) => Ok(ToolResult::success(
                "get_testnet_tokens",
                format!(
                    "Successfully sent {} Near tokens with transaction hash {}",
                    FAUCET_AMOUNT_NEAR, receipt.tx_hash
                ),
            )),
            // The faucet answered but declined; that is news for the user, not a bad call.
            Err(NearError::Faucet(reason)) => Ok(ToolResult::success(
                "get_testnet_tokens",
                format!("An error occurred: {reason}"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::MockNearClient;
    use agent_core::AgentError;
    use serde_json::json;

    fn call(receiver: &str) -> ToolCall {
        let mut arguments = serde_json::Map::new();
        arguments.insert("receiver".into(), json!(receiver));
        ToolCall::new("get_testnet_tokens", arguments)
    }

    #[tokio::test]
    async fn test_sends_tokens() {
        let tool = GetTestnetTokensTool::new(Arc::new(MockNearClient::default()));
        let result = tool.execute(&call("alice.testnet")).await.unwrap();

        assert!(result.success);
        assert!(result.output.starts_with("Successfully sent 10 Near tokens with transaction hash "));
    }

    #[tokio::test]
    async fn test_rejects_bad_account() {
        let tool = GetTestnetTokensTool::new(Arc::new(MockNearClient::default()));
        let err = tool.execute(&call("Not An Account")).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }
}
