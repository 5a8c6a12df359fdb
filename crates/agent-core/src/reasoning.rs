//! Agent Loop
//!
//! Drives one user message to a final answer:
//!
//! ```text
//! BUILD_PROMPT -> AWAIT_COMPLETION -> EXTRACT -+-> no tool call: yield answer, stop
//!                       ^                      |
//!                       +---- execute tools <--+   (at most max_recurse_depth times)
//! ```
//!
//! When the depth budget runs out while the model keeps calling tools, the
//! content of the last appended message is yielded as the answer.

use futures::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::prompt::{PromptBuilder, SystemPromptTemplate};
use crate::protocol::{ToolExecutor, extract_tool_calls};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::token::{TokenCounter, WordTokenCounter};
use crate::tool::{Tool, ToolRegistry};

/// Interim chunk yielded after each tool round trip in verbose mode
pub const PROGRESS_NOTICE: &str = "Processing the gathered information...";

/// Lazy sequence of user-visible chunks; the last one is the answer
pub type ResponseStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Token budget shared by the system and user prompts
    pub max_prompt_tokens: usize,

    /// Completion attempts per loop iteration
    pub max_completion_tries: usize,

    /// Tool round trips allowed per user message
    pub max_recurse_depth: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Yield a progress notice after each tool round trip
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: 2048,
            max_completion_tries: 3,
            max_recurse_depth: 3,
            generation: GenerationOptions::default(),
            verbose: false,
        }
    }
}

impl AgentConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_prompt_tokens: config.model.max_prompt_tokens,
            max_completion_tries: config.agent.max_completion_tries,
            max_recurse_depth: config.agent.max_recurse_depth,
            generation: GenerationOptions::from_config(config),
            verbose: config.debug,
        }
    }
}

/// The main Agent struct
///
/// Holds configuration and collaborators only; every `respond` call owns its
/// own conversation, so one agent can serve concurrent requests.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
    executor: ToolExecutor,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompts: PromptBuilder,
        executor: ToolExecutor,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            prompts,
            executor,
            config,
        }
    }

    /// Wire an agent from loaded configuration
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        let template = SystemPromptTemplate::load(&config.agent.system_prompt_template)?;
        let prompts = PromptBuilder::new(template, &config.chat_ml, &tools, counter)?;
        Ok(Self::new(
            provider,
            prompts,
            ToolExecutor::new(tools),
            AgentConfig::from_config(config),
        ))
    }

    /// Build the initial system + user conversation and its token count
    pub fn generate_prompt(&self, message: &str) -> Result<(Conversation, usize)> {
        let limit = self.config.max_prompt_tokens;
        let (system, system_tokens) = self.prompts.system_prompt(limit)?;
        let (user, user_tokens) = self.prompts.user_prompt(message, limit - system_tokens)?;
        Ok((Conversation::new(system, user), system_tokens + user_tokens))
    }

    /// Request a completion, retrying transport failures up to
    /// `max_completion_tries` attempts. Any other error ends the attempts early.
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        let mut errors = Vec::new();

        for attempt in 1..=self.config.max_completion_tries {
            match self
                .provider
                .complete(messages, &self.config.generation)
                .await
            {
                Ok(completion) => return Ok(completion.content),
                Err(e) => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt,
                        error = %e,
                        "Completion attempt failed"
                    );
                    let retryable = e.is_retryable();
                    errors.push(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(AgentError::CompletionExhausted {
            attempts: errors.len(),
            errors,
        })
    }

    /// Answer a user message as a lazy sequence of chunks.
    ///
    /// Yields interim progress notices (verbose mode only) and then exactly one
    /// final answer. A hard failure is yielded as the last item.
    pub fn respond<'a>(&'a self, message: &'a str) -> ResponseStream<'a> {
        Box::pin(async_stream::stream! {
            let mut conversation = match self.generate_prompt(message) {
                Ok((conversation, tokens)) => {
                    tracing::debug!(tokens, messages = ?conversation.messages(), "Initial conversation");
                    conversation
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let max_depth = self.config.max_recurse_depth;
            let mut depth = 0;

            while depth < max_depth {
                let completion = match self.complete(conversation.messages()).await {
                    Ok(completion) => completion,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                tracing::debug!(depth, %completion, "Raw completion");

                let extraction = extract_tool_calls(&completion);
                if extraction.calls.is_empty() {
                    yield Ok(extraction.cleaned.trim().to_string());
                    return;
                }

                depth += 1;
                let tool_message = self
                    .executor
                    .execute(&extraction.calls, depth)
                    .await
                    .unwrap_or_default();

                conversation.push(Message::assistant(extraction.cleaned));
                conversation.push(self.prompts.tool_prompt(tool_message));
                tracing::debug!(depth, max_depth, "Tool round trip complete");

                if self.config.verbose {
                    yield Ok(PROGRESS_NOTICE.to_string());
                }
            }

            tracing::info!(max_depth, "Recursion budget exhausted, returning last message");
            yield Ok(conversation.last().content.clone());
        })
    }

    /// Run to completion and return only the final answer
    pub async fn ask(&self, message: &str) -> Result<String> {
        let mut stream = self.respond(message);
        let mut last = None;
        while let Some(chunk) = stream.next().await {
            last = Some(chunk?);
        }
        last.ok_or_else(|| AgentError::Other("agent produced no output".into()))
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    template: SystemPromptTemplate,
    chat_ml: crate::config::ChatMlConfig,
    counter: Arc<dyn TokenCounter>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            template: SystemPromptTemplate::default(),
            chat_ml: crate::config::ChatMlConfig::default(),
            counter: Arc::new(WordTokenCounter),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn template(mut self, template: SystemPromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn chat_ml(mut self, chat_ml: crate::config::ChatMlConfig) -> Self {
        self.chat_ml = chat_ml;
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn max_prompt_tokens(mut self, max: usize) -> Self {
        self.config.max_prompt_tokens = max;
        self
    }

    pub fn max_completion_tries(mut self, max: usize) -> Self {
        self.config.max_completion_tries = max;
        self
    }

    pub fn max_recurse_depth(mut self, max: usize) -> Self {
        self.config.max_recurse_depth = max;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        if self.config.max_completion_tries == 0 || self.config.max_recurse_depth == 0 {
            return Err(AgentError::Config(
                "completion tries and recursion depth must be at least 1".into(),
            ));
        }

        let tools = Arc::new(self.tools);
        let prompts = PromptBuilder::new(self.template, &self.chat_ml, &tools, self.counter)?;
        Ok(Agent::new(
            provider,
            prompts,
            ToolExecutor::new(tools),
            self.config,
        ))
    }
}
