//! Tool-Call Protocol
//!
//! The model asks for a tool by writing a JSON object between `<tool_call>`
//! markers somewhere in its free text. Results go back as `<tool_response>`
//! blocks inside an assistant message.
//!
//! ```text
//! I'll mint that for you.
//! <tool_call>{"name": "mint_near_nft", "arguments": {"receiver": "alice.testnet"}}</tool_call>
//! ```
//!
//! Only the first well-formed block of a completion is honored. Blocks that
//! fail to parse are dropped from the text; when none parses, the completion
//! is treated as a final answer with no protocol markup left in it.

use futures::future::join_all;
use serde_json::{Map, Value, json};
use std::ops::Range;
use std::sync::Arc;

use crate::tool::{ToolCall, ToolRegistry};

pub const TOOL_CALL_OPEN: &str = "<tool_call>";
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";
pub const TOOL_RESPONSE_OPEN: &str = "<tool_response>";
pub const TOOL_RESPONSE_CLOSE: &str = "</tool_response>";

const LINE_SEPARATOR: &str = "\n";

/// JSON schema the model is taught to follow inside `<tool_call>`
pub fn tool_call_schema() -> Value {
    json!({
        "title": "ToolCallSchema",
        "type": "object",
        "properties": {
            "name": { "title": "Name", "type": "string" },
            "arguments": { "title": "Arguments", "type": "object" },
        },
        "required": ["name", "arguments"],
    })
}

/// Outcome of scanning a completion for a tool-call block
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBlock {
    /// No complete open/close marker pair
    NoBlock,
    /// A delimited block whose body is not a valid call
    Malformed { span: Range<usize>, reason: String },
    /// A well-formed call and the byte span of its block (markers included)
    Call { span: Range<usize>, call: ToolCall },
}

/// Locate and parse the first delimited tool-call block
pub fn parse_block(text: &str) -> ParsedBlock {
    let Some(start) = text.find(TOOL_CALL_OPEN) else {
        return ParsedBlock::NoBlock;
    };
    let body_start = start + TOOL_CALL_OPEN.len();
    let Some(close) = text[body_start..].find(TOOL_CALL_CLOSE) else {
        return ParsedBlock::NoBlock;
    };
    let body_end = body_start + close;
    let span = start..body_end + TOOL_CALL_CLOSE.len();

    match parse_call(text[body_start..body_end].trim()) {
        Ok(call) => ParsedBlock::Call { span, call },
        Err(reason) => ParsedBlock::Malformed { span, reason },
    }
}

fn parse_call(body: &str) -> std::result::Result<ToolCall, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    let Value::Object(mut object) = value else {
        return Err("tool call is not a JSON object".into());
    };

    let name = match object.remove("name") {
        Some(Value::String(name)) => name,
        Some(_) => return Err("'name' is not a string".into()),
        None => return Err("missing 'name'".into()),
    };
    let arguments = match object.remove("arguments") {
        Some(Value::Object(arguments)) => arguments,
        Some(Value::Null) => Map::new(),
        Some(_) => return Err("'arguments' is not an object".into()),
        None => return Err("missing 'arguments'".into()),
    };

    Ok(ToolCall { name, arguments })
}

/// Cleaned completion text plus the calls found in it
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    /// Completion with every tool-call block and stray marker removed
    pub cleaned: String,
    /// Zero or one call
    pub calls: Vec<ToolCall>,
}

/// Split a completion into user-visible text and at most one tool call.
///
/// Blocks are scanned in order: malformed ones are dropped, the first
/// well-formed one is honored and any later ones are discarded. An opener
/// without a closing marker drops the rest of the text, since what follows it
/// is an unfinished call rather than prose.
pub fn extract_tool_calls(completion: &str) -> Extraction {
    let mut cleaned = String::with_capacity(completion.len());
    let mut calls = Vec::new();
    let mut rest = completion;

    loop {
        match parse_block(rest) {
            ParsedBlock::NoBlock => {
                match rest.find(TOOL_CALL_OPEN) {
                    Some(open) => {
                        tracing::warn!("Discarding unterminated tool call block");
                        cleaned.push_str(&rest[..open]);
                    }
                    None => cleaned.push_str(rest),
                }
                break;
            }
            ParsedBlock::Malformed { span, reason } => {
                tracing::warn!(%reason, "Discarding malformed tool call block");
                cleaned.push_str(&rest[..span.start]);
                rest = &rest[span.end..];
            }
            ParsedBlock::Call { span, call } => {
                if calls.is_empty() {
                    tracing::debug!(tool = %call.name, "Extracted tool call");
                    calls.push(call);
                } else {
                    tracing::debug!(tool = %call.name, "Ignoring tool call after the first");
                }
                cleaned.push_str(&rest[..span.start]);
                rest = &rest[span.end..];
            }
        }
    }

    if calls.is_empty() && cleaned == completion {
        tracing::debug!("No tool call block found in completion");
    }

    Extraction {
        cleaned: cleaned.replace(TOOL_CALL_CLOSE, ""),
        calls,
    }
}

/// Runs extracted calls against the registry and renders the response block
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a batch of calls.
    ///
    /// Calls run concurrently; their blocks are concatenated in call order.
    /// A failing call produces an error block and never affects its siblings.
    /// Returns `None` for an empty batch.
    pub async fn execute(&self, calls: &[ToolCall], depth: usize) -> Option<String> {
        if calls.is_empty() {
            return None;
        }

        let blocks = join_all(calls.iter().map(|call| self.execute_one(call))).await;

        let mut message = format!("Current call depth: {depth}{LINE_SEPARATOR}");
        for block in blocks {
            message.push_str(&block);
        }
        Some(message)
    }

    async fn execute_one(&self, call: &ToolCall) -> String {
        tracing::debug!(tool = %call.name, arguments = ?call.arguments, "Executing tool call");

        match self.registry.execute(call).await {
            Ok(result) => {
                let body = json!({ "name": call.name, "content": result.content() });
                format!(
                    "{TOOL_RESPONSE_OPEN}{LINE_SEPARATOR}{body}{LINE_SEPARATOR}{TOOL_RESPONSE_CLOSE}{LINE_SEPARATOR}"
                )
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                format!(
                    "{TOOL_RESPONSE_OPEN}{LINE_SEPARATOR}\
                     There was an error when executing the function: {name}{LINE_SEPARATOR}\
                     Error: {e}{LINE_SEPARATOR}\
                     Please call this function again with correct arguments within XML tags {TOOL_CALL_OPEN}{TOOL_CALL_CLOSE}{LINE_SEPARATOR}\
                     {TOOL_RESPONSE_CLOSE}{LINE_SEPARATOR}",
                    name = call.name,
                )
            }
        }
    }
}
