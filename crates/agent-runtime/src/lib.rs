//! # agent-runtime
//!
//! Completion providers for the agent loop.
//!
//! ## Providers
//!
//! - **OpenAI** (default): any OpenAI-compatible `/v1/chat/completions` endpoint
//! - **Ollama** (feature `ollama`): local inference via Ollama
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::provider_from_config;
//!
//! let provider = provider_from_config(&config)?;
//! let agent = Agent::from_config(&config, provider, tools, counter)?;
//! ```

pub mod openai;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaEndpoint, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

use std::sync::Arc;

use agent_core::config::{Config, ProviderKind};

// Re-export core types for convenience
pub use agent_core::{Agent, AgentError, LlmProvider, Message, Result, Role, Tool, ToolRegistry};

/// Select the completion backend named by `model.provider`
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    match config.model.provider {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(OpenAiConfig::from_config(
            config,
        )))),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::from_config(config))),
        #[cfg(not(feature = "ollama"))]
        ProviderKind::Ollama => Err(AgentError::Config(
            "model.provider is 'ollama' but the ollama feature is disabled".into(),
        )),
    }
}
