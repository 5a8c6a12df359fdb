//! Prompt Construction
//!
//! Renders the system and user messages under token budgets. The system prompt
//! carries the tool catalog and the tool-call schema and is measured first;
//! whatever budget it leaves is what the user message may use. Prompts that do
//! not fit are rejected, never truncated.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::ChatMlConfig;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::protocol::tool_call_schema;
use crate::token::TokenCounter;
use crate::tool::ToolRegistry;

/// Sections of the system prompt, each a template string
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SystemPromptTemplate {
    #[serde(rename = "Role", default)]
    pub role: String,
    #[serde(rename = "Objective", default)]
    pub objective: String,
    #[serde(rename = "Tools", default)]
    pub tools: String,
}

impl SystemPromptTemplate {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!(
                "cannot read system prompt template {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn sections(&self) -> [&str; 3] {
        [
            self.role.as_str(),
            self.objective.as_str(),
            self.tools.as_str(),
        ]
    }
}

/// Values substituted into the system prompt template
struct Variables<'a> {
    date: &'a str,
    tools: &'a str,
    tool_schema: &'a str,
}

impl Variables<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "date" => Some(self.date),
            "tools" => Some(self.tools),
            "tool_schema" => Some(self.tool_schema),
            _ => None,
        }
    }
}

/// Substitute `{name}` placeholders; `{{` and `}}` are literal braces.
fn render(template: &str, vars: &Variables<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(AgentError::Template(format!(
                                "unterminated placeholder '{{{name}'"
                            )));
                        }
                    }
                }
                let value = vars.get(&name).ok_or_else(|| {
                    AgentError::Template(format!("unknown placeholder '{{{name}}}'"))
                })?;
                out.push_str(value);
            }
            '}' => return Err(AgentError::Template("single '}' in template".into())),
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn current_time() -> String {
    chrono::Local::now()
        .format("%A, %B %d, %Y @ %H:%M:%S")
        .to_string()
}

/// Builds budgeted prompt messages
#[derive(Clone)]
pub struct PromptBuilder {
    template: SystemPromptTemplate,
    user_prepend: String,
    user_append: String,
    tools_json: String,
    tool_schema_json: String,
    counter: Arc<dyn TokenCounter>,
    clock: fn() -> String,
}

impl PromptBuilder {
    pub fn new(
        template: SystemPromptTemplate,
        chat_ml: &ChatMlConfig,
        tools: &ToolRegistry,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        Ok(Self {
            template,
            user_prepend: chat_ml.user_prepend.clone(),
            user_append: chat_ml.user_append.clone(),
            tools_json: serde_json::to_string(&tools.catalog())?,
            tool_schema_json: serde_json::to_string(&tool_call_schema())?,
            counter,
            clock: current_time,
        })
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    pub fn counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    fn wrap(&self, content: &str) -> String {
        format!("{} {} {}", self.user_prepend, content, self.user_append)
            .trim()
            .to_string()
    }

    fn measure(&self, prompt: &'static str, content: &str, limit: usize) -> Result<usize> {
        let used = self.counter.count(content);
        if used > limit {
            tracing::warn!(prompt, used, limit, "Prompt exceeds token limit");
            return Err(AgentError::BudgetExceeded { prompt, used, limit });
        }
        Ok(used)
    }

    /// Render the system message and its measured token length
    pub fn system_prompt(&self, token_limit: usize) -> Result<(Message, usize)> {
        let date = (self.clock)();
        let vars = Variables {
            date: &date,
            tools: &self.tools_json,
            tool_schema: &self.tool_schema_json,
        };

        let mut content = String::new();
        for section in self.template.sections() {
            content.push_str(&render(section, &vars)?.replace('\n', " "));
            content.push(' ');
        }
        let content = self.wrap(content.trim());

        let used = self.measure("system", &content, token_limit)?;
        Ok((Message::system(content), used))
    }

    /// Wrap the raw user message and measure it
    pub fn user_prompt(&self, message: &str, token_limit: usize) -> Result<(Message, usize)> {
        let content = self.wrap(message);
        let used = self.measure("user", &content, token_limit)?;
        Ok((Message::user(content), used))
    }

    /// Tool output re-enters the conversation as assistant content
    pub fn tool_prompt(&self, tool_response: impl Into<String>) -> Message {
        Message::assistant(tool_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::token::WordTokenCounter;
    use crate::tool::tests::GreetTool;

    const TEMPLATE: &str = r"
Role: |
  You are a NEAR assistant.
  Today is {date}.
Objective: Answer questions about NEAR.
Tools: 'Tools: {tools} Call format: {tool_schema} Use {{braces}} literally.'
";

    fn fixed_clock() -> String {
        "Monday, January 01, 2024 @ 12:00:00".into()
    }

    fn builder(prepend: &str, append: &str) -> PromptBuilder {
        let mut registry = ToolRegistry::new();
        registry.register(GreetTool);
        let chat_ml = ChatMlConfig {
            user_prepend: prepend.into(),
            user_append: append.into(),
            stop_sequences: Vec::new(),
        };
        PromptBuilder::new(
            SystemPromptTemplate::from_yaml_str(TEMPLATE).unwrap(),
            &chat_ml,
            &registry,
            Arc::new(WordTokenCounter),
        )
        .unwrap()
        .with_clock(fixed_clock)
    }

    #[test]
    fn test_system_prompt_substitutes_variables() {
        let (message, used) = builder("", "").system_prompt(10_000).unwrap();

        assert_eq!(message.role, Role::System);
        assert!(message.content.starts_with("You are a NEAR assistant. Today is Monday, January 01, 2024"));
        assert!(message.content.contains("\"name\":\"greet\""));
        assert!(message.content.contains("ToolCallSchema"));
        assert!(message.content.contains("Use {braces} literally."));
        assert!(!message.content.contains('\n'));
        assert_eq!(used, WordTokenCounter.count(&message.content));
    }

    #[test]
    fn test_system_prompt_respects_limit() {
        let builder = builder("", "");
        let (message, _) = builder.system_prompt(10_000).unwrap();
        let exact = WordTokenCounter.count(&message.content);

        let (_, used) = builder.system_prompt(exact).unwrap();
        assert!(used <= exact);

        let err = builder.system_prompt(exact - 1).unwrap_err();
        assert!(matches!(err, AgentError::BudgetExceeded { prompt: "system", .. }));
    }

    #[test]
    fn test_user_prompt_wraps_and_measures() {
        let builder = builder("<|im_start|>user", "<|im_end|>");
        let (message, used) = builder.user_prompt("mint me an NFT", 100).unwrap();

        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "<|im_start|>user mint me an NFT <|im_end|>");
        assert_eq!(used, WordTokenCounter.count(&message.content));

        let err = builder.user_prompt("mint me an NFT", 3).unwrap_err();
        assert!(matches!(err, AgentError::BudgetExceeded { prompt: "user", limit: 3, .. }));
    }

    #[test]
    fn test_empty_fragments_are_trimmed() {
        let (message, _) = builder("", "").user_prompt("hello", 10).unwrap();
        assert_eq!(message.content, "hello");
    }

    #[test]
    fn test_tool_prompt_is_assistant() {
        let message = builder("", "").tool_prompt("Current call depth: 1\n");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Current call depth: 1\n");
    }

    #[test]
    fn test_unknown_placeholder_is_rejected() {
        let vars = Variables { date: "d", tools: "t", tool_schema: "s" };
        assert!(matches!(render("{nope}", &vars), Err(AgentError::Template(_))));
        assert!(matches!(render("{date", &vars), Err(AgentError::Template(_))));
        assert_eq!(render("{date}/{{x}}", &vars).unwrap(), "d/{x}");
    }

    #[test]
    fn test_load_template_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEMPLATE.as_bytes()).unwrap();

        let template = SystemPromptTemplate::load(file.path()).unwrap();
        assert!(template.role.starts_with("You are a NEAR assistant."));
        assert_eq!(template.objective, "Answer questions about NEAR.");
        assert!(template.tools.contains("{tool_schema}"));
    }

    #[test]
    fn test_load_missing_template_is_config_error() {
        let err = SystemPromptTemplate::load("/nonexistent/system_prompt.yaml").unwrap_err();
        assert!(matches!(err, AgentError::Config(ref msg) if msg.contains("/nonexistent/system_prompt.yaml")));
    }
}
