//! Configuration
//!
//! One `Config` value is loaded at process start and handed to constructors.
//! Nothing in the agent reads ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AgentError, Result};

/// Default OpenAI chat completions endpoint
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Full agent configuration (`config/general.yaml`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub agent: AgentSettings,
    pub chat_ml: ChatMlConfig,
    #[serde(default)]
    pub near: NearConfig,
    /// Verbose mode: interim progress chunks and debug logging
    #[serde(default)]
    pub debug: bool,
}

/// Which completion backend to talk to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    pub max_prompt_tokens: usize,
    pub max_completion_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_model_name() -> String {
    "gpt-3.5-turbo".into()
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSettings {
    pub max_completion_tries: usize,
    pub max_recurse_depth: usize,
    /// YAML file with `Role`, `Objective` and `Tools` fields
    pub system_prompt_template: PathBuf,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatMlConfig {
    #[serde(default)]
    pub user_prepend: String,
    #[serde(default)]
    pub user_append: String,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NearConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "default_faucet_url")]
    pub faucet_url: String,
    /// Use the in-memory chain instead of RPC
    #[serde(default)]
    pub mock: bool,
}

fn default_rpc_url() -> String {
    "https://rpc.testnet.near.org".into()
}
fn default_faucet_url() -> String {
    "https://near-faucet.io/api/faucet/tokens".into()
}

impl Default for NearConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            account_id: String::new(),
            faucet_url: default_faucet_url(),
            mock: false,
        }
    }
}

impl Config {
    /// Parse and validate YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    ///
    /// A relative `system_prompt_template` is kept as written, i.e. resolved
    /// against the working directory like the config path itself.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply environment overrides (`DEBUG`, `NEAR_RPC_URL`, `NEAR_ACCOUNT_ID`)
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(debug) = lookup("DEBUG") {
            self.debug = matches!(debug.to_ascii_lowercase().as_str(), "true" | "1");
        }
        if let Some(url) = lookup("NEAR_RPC_URL") {
            self.near.rpc_url = url;
        }
        if let Some(account) = lookup("NEAR_ACCOUNT_ID") {
            self.near.account_id = account;
        }
    }

    /// Reject budgets that would make the loop meaningless
    pub fn validate(&self) -> Result<()> {
        if self.model.max_prompt_tokens == 0 {
            return Err(AgentError::Config("model.max_prompt_tokens must be positive".into()));
        }
        if self.agent.max_completion_tries == 0 {
            return Err(AgentError::Config(
                "agent.max_completion_tries must be at least 1".into(),
            ));
        }
        if self.agent.max_recurse_depth == 0 {
            return Err(AgentError::Config(
                "agent.max_recurse_depth must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(AgentError::Config(format!(
                "model.temperature {} outside [0, 2]",
                self.model.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(AgentError::Config(format!(
                "model.top_p {} outside [0, 1]",
                self.model.top_p
            )));
        }
        Ok(())
    }
}
