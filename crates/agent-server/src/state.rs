//! Application State

use std::sync::Arc;

use agent_core::{Agent, LlmProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent shared by every request; conversations are per request
    pub agent: Arc<Agent>,

    /// LLM provider, for health reporting
    pub provider: Arc<dyn LlmProvider>,
}
