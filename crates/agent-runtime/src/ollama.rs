//! Ollama Provider
//!
//! Local inference through an Ollama server. The endpoint comes from
//! `model.api_url` unless it is left at the OpenAI default; `OLLAMA_HOST`
//! and `OLLAMA_PORT` override it.

use agent_core::{
    config::{Config, DEFAULT_API_URL},
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    models::ModelOptions,
};

const DEFAULT_HOST: &str = "http://localhost";
const DEFAULT_PORT: u16 = 11434;

/// Where the Ollama server listens
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for OllamaEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl OllamaEndpoint {
    /// Split `scheme://host:port[/path]`; a URL without a port keeps the default one
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let authority = rest.split('/').next().filter(|a| !a.is_empty())?;

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (authority, DEFAULT_PORT),
        };
        Some(Self {
            host: format!("{scheme}://{host}"),
            port,
        })
    }

    /// Endpoint for `config`, with environment overrides applied
    pub fn from_config(config: &Config) -> Self {
        let mut endpoint = if config.model.api_url == DEFAULT_API_URL {
            Self::default()
        } else {
            Self::parse(&config.model.api_url).unwrap_or_default()
        };
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            endpoint.host = host;
        }
        if let Some(port) = std::env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
            endpoint.port = port;
        }
        endpoint
    }
}

/// Ollama completion provider
pub struct OllamaProvider {
    endpoint: OllamaEndpoint,
}

impl OllamaProvider {
    pub fn new(endpoint: OllamaEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OllamaEndpoint::from_config(config))
    }

    fn url(&self) -> String {
        format!("{}:{}", self.endpoint.host, self.endpoint.port)
    }

    /// A fresh client per call, so no connection outlives a request
    fn client(&self) -> Result<Ollama> {
        Ollama::try_new(self.url())
            .map_err(|e| AgentError::Config(format!("invalid Ollama endpoint {}: {e}", self.url())))
    }

    fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn options(opts: &GenerationOptions) -> ModelOptions {
        let options = ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));
        if opts.stop_sequences.is_empty() {
            options
        } else {
            options.stop(opts.stop_sequences.clone())
        }
    }

    fn usage(response: &ChatMessageResponse) -> Option<TokenUsage> {
        response.final_data.as_ref().map(|d| {
            let prompt = u32::try_from(d.prompt_eval_count).unwrap_or(u32::MAX);
            let completion = u32::try_from(d.eval_count).unwrap_or(u32::MAX);
            TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt.saturating_add(completion),
            }
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client()?.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(host = %self.endpoint.host, port = self.endpoint.port, error = %e, "Ollama unreachable");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request =
            ChatMessageRequest::new(options.model.clone(), Self::to_chat_messages(messages))
                .options(Self::options(options));

        let response = self
            .client()?
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(format!("ollama {}: {e}", options.model)))?;

        let usage = Self::usage(&response);
        Ok(Completion {
            content: response.message.content,
            model: options.model.clone(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_url() {
        let endpoint = OllamaEndpoint::parse("http://gpu-box:8080/api/chat").unwrap();
        assert_eq!(endpoint.host, "http://gpu-box");
        assert_eq!(endpoint.port, 8080);

        let endpoint = OllamaEndpoint::parse("http://localhost").unwrap();
        assert_eq!(endpoint.port, 11434);

        assert!(OllamaEndpoint::parse("localhost:11434").is_none());
        assert!(OllamaEndpoint::parse("http://host:notaport").is_none());
    }

    #[test]
    fn test_tool_output_keeps_assistant_role() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::assistant("Current call depth: 1\n"),
        ];

        let converted = OllamaProvider::to_chat_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2].role, MessageRole::Assistant);
        assert_eq!(converted[2].content, "Current call depth: 1\n");
    }

    #[tokio::test]
    async fn test_bad_endpoint_is_config_error_not_panic() {
        let provider = OllamaProvider::new(OllamaEndpoint {
            host: "not a url".into(),
            port: 11434,
        });
        let messages = vec![Message::user("Hello")];

        let err = provider
            .complete(&messages, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(!err.is_retryable());
        assert!(provider.health_check().await.is_err());
    }

    #[test]
    fn test_options_only_send_stop_when_set() {
        let mut opts = GenerationOptions::default();
        let value = serde_json::to_value(OllamaProvider::options(&opts)).unwrap();
        assert!(value.get("stop").is_none());
        assert_eq!(value["num_predict"], 512);

        opts.stop_sequences = vec!["<|im_end|>".into()];
        let value = serde_json::to_value(OllamaProvider::options(&opts)).unwrap();
        assert_eq!(value["stop"][0], "<|im_end|>");
    }
}
