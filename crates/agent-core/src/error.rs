//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// A rendered prompt does not fit its token budget
    #[error("{prompt} prompt exceeds token limit: {used} tokens (max: {limit})")]
    BudgetExceeded {
        prompt: &'static str,
        used: usize,
        limit: usize,
    },

    /// Transport-level failure talking to the completion endpoint
    #[error("Provider error: {0}")]
    Provider(String),

    /// Completion endpoint answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    /// Every completion attempt failed
    #[error("Failed to complete prompt after {attempts} tries: [{}]", join_errors(.errors))]
    CompletionExhausted {
        attempts: usize,
        errors: Vec<AgentError>,
    },

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments could not be bound to the tool's parameters
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// System prompt template could not be rendered
    #[error("Template error: {0}")]
    Template(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

fn join_errors(errors: &[AgentError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AgentError {
    /// Whether another completion attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Provider(_) | AgentError::ProviderStatus { .. } | AgentError::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::BudgetExceeded { .. } => {
                "Your message is too long for the assistant to process. Please shorten it.".into()
            }
            AgentError::Provider(_) | AgentError::ProviderStatus { .. } => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::CompletionExhausted { attempts, .. } => format!(
                "The AI service did not respond after {attempts} attempts. Please try again later."
            ),
            AgentError::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            AgentError::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            AgentError::ToolExecution(msg) => format!("Tool error: {msg}"),
            AgentError::Config(_) | AgentError::Template(_) | AgentError::Yaml(_) => {
                "The assistant is misconfigured. Please contact the operator.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_lists_every_attempt() {
        let err = AgentError::CompletionExhausted {
            attempts: 2,
            errors: vec![
                AgentError::ProviderStatus { status: 500, body: "boom".into() },
                AgentError::Provider("connection reset".into()),
            ],
        };

        let text = err.to_string();
        assert!(text.contains("after 2 tries"));
        assert!(text.contains("status 500: boom"));
        assert!(text.contains("connection reset"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_transport_failures_are_retryable() {
        assert!(AgentError::Provider("x".into()).is_retryable());
        assert!(AgentError::ProviderStatus { status: 503, body: String::new() }.is_retryable());
        assert!(!AgentError::Config("bad endpoint".into()).is_retryable());
        assert!(!AgentError::ToolNotFound("x".into()).is_retryable());
    }
}
