//! Error Types for NEAR Tools

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NearError>;

#[derive(Error, Debug)]
pub enum NearError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Faucet error: {0}")]
    Faucet(String),

    #[error("Invalid account id '{0}'")]
    InvalidAccount(String),

    #[error("Signed transactions from {0} require a signer, which this client does not have")]
    SigningUnavailable(String),

    #[error("Amount out of range: {0}")]
    Amount(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<NearError> for AgentError {
    fn from(err: NearError) -> Self {
        match err {
            NearError::InvalidAccount(_) | NearError::Amount(_) => {
                AgentError::ToolValidation(err.to_string())
            }
            other => AgentError::ToolExecution(other.to_string()),
        }
    }
}
