//! # agent-core
//!
//! Agent orchestration loop with a provider-agnostic completion interface and a
//! text-embedded tool-call protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Agent                                │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────────┐ │
//! │  │ PromptBuilder│──▶│  LlmProvider │──▶│ Tool-call protocol    │ │
//! │  │ (+ Token     │   │  (Strategy)  │   │ extract ─▶ ToolExecutor│ │
//! │  │    Counter)  │   └──────────────┘   │            (Registry) │ │
//! │  └──────────────┘          ▲           └───────────┬───────────┘ │
//! │                            └──── tool responses ───┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The model requests tools by writing `<tool_call>{...}</tool_call>` in its
//! reply; results are fed back as `<tool_response>` blocks until the model
//! answers without a tool call or the recursion budget runs out.

pub mod config;
pub mod error;
pub mod message;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod reasoning;
pub mod token;
pub mod tool;

pub use config::Config;
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use prompt::{PromptBuilder, SystemPromptTemplate};
pub use protocol::{Extraction, ParsedBlock, ToolExecutor, extract_tool_calls};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, ResponseStream};
pub use token::{CharRatioCounter, TokenCounter, WordTokenCounter};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
