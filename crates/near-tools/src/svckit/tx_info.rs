//! Transaction Info Tool

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::model::validate_account_id;
use crate::near::NearClient;

/// Tool for looking up a transaction's status and receipts
pub struct TransactionInfoTool {
    client: Arc<dyn NearClient>,
}

impl TransactionInfoTool {
    pub fn new(client: Arc<dyn NearClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TransactionInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_near_transaction_info".into(),
            description: "Get information about a Near transaction".into(),
            parameters: vec![
                ParameterSchema::required("tx_hash", "string", "Hash of the transaction"),
                ParameterSchema::required(
                    "sender_account",
                    "string",
                    "Account that sent the transaction",
                ),
            ],
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let tx_hash = call.str_arg("tx_hash")?;
        let sender = call.str_arg("sender_account")?;
        validate_account_id(sender)?;

        let status = self.client.tx_status(tx_hash, sender).await?;
        Ok(ToolResult::success(
            "get_near_transaction_info",
            format!("Status of transaction {tx_hash}"),
        )
        .with_data(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::MockNearClient;
    use agent_core::AgentError;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_structured_status() {
        let client = Arc::new(MockNearClient::default());
        let receipt = client.request_faucet("alice.testnet", 1).await.unwrap();
        let tool = TransactionInfoTool::new(client);

        let mut arguments = serde_json::Map::new();
        arguments.insert("tx_hash".into(), json!(receipt.tx_hash));
        arguments.insert("sender_account".into(), json!("nearaibot.testnet"));
        let result = tool
            .execute(&ToolCall::new("get_near_transaction_info", arguments))
            .await
            .unwrap();

        let content = result.content();
        assert_eq!(content["transaction"]["receiver_id"], "alice.testnet");
    }

    #[tokio::test]
    async fn test_unknown_hash_is_execution_error() {
        let tool = TransactionInfoTool::new(Arc::new(MockNearClient::default()));

        let mut arguments = serde_json::Map::new();
        arguments.insert("tx_hash".into(), json!("missing"));
        arguments.insert("sender_account".into(), json!("alice.testnet"));
        let err = tool
            .execute(&ToolCall::new("get_near_transaction_info", arguments))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution(_)));
    }
}
