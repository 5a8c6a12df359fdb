//! OpenAI-compatible Provider
//!
//! Implementation of `LlmProvider` for any `/v1/chat/completions` endpoint.

use std::time::Duration;

use agent_core::{
    config::{Config, DEFAULT_API_URL},
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Full chat completions URL
    pub api_url: String,

    /// Bearer token (optional for local endpoints)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    /// Endpoint settings from config, key from `OPENAI_API_KEY`
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.model.api_url.clone(),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: config.model.timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self { config }
    }

    fn build_request<'a>(messages: &'a [Message], options: &'a GenerationOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &options.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: (!options.stop_sequences.is_empty()).then_some(options.stop_sequences.as_slice()),
        }
    }

    fn convert_completion(response: ChatResponse, model: &str) -> Result<Completion> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AgentError::Provider("response contained no message content".into()))?;

        Ok(Completion {
            content,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        // Client (and its connection pool) lives only for this call.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let mut request = client
            .post(&self.config.api_url)
            .json(&Self::build_request(messages, options));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid response body: {e}")))?;

        Self::convert_completion(body, &options.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.api_url, "https://api.openai.com/v1/chat/completions");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_request_payload() {
        let messages = vec![Message::system("You are helpful."), Message::user("Hello")];
        let options = GenerationOptions {
            model: "gpt-3.5-turbo".into(),
            max_tokens: 128,
            ..Default::default()
        };

        let payload = serde_json::to_value(OpenAiProvider::build_request(&messages, &options)).unwrap();
        assert_eq!(payload["model"], "gpt-3.5-turbo");
        assert_eq!(payload["max_tokens"], 128);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "Hello");
        assert!(payload.get("stop").is_none());

        let options = GenerationOptions {
            stop_sequences: vec!["<|im_end|>".into()],
            ..options
        };
        let payload = serde_json::to_value(OpenAiProvider::build_request(&messages, &options)).unwrap();
        assert_eq!(payload["stop"][0], "<|im_end|>");
    }

    #[test]
    fn test_response_conversion() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"model": "gpt-3.5-turbo-0125",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi!"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}}"#,
        )
        .unwrap();

        let completion = OpenAiProvider::convert_completion(body, "gpt-3.5-turbo").unwrap();
        assert_eq!(completion.content, "Hi!");
        assert_eq!(completion.model, "gpt-3.5-turbo-0125");
        assert_eq!(completion.usage.unwrap().total_tokens, 11);
    }

    #[test]
    fn test_empty_choices_is_provider_error() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = OpenAiProvider::convert_completion(body, "m").unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            api_key: None,
            timeout_secs: 2,
        });

        let err = provider
            .complete(&[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }
}
