//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};

use agent_core::AgentError;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Final answer
    pub message: String,
    /// Interim notices emitted before the answer
    pub progress: Vec<String>,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::BudgetExceeded { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "BUDGET_EXCEEDED"),
        AgentError::CompletionExhausted { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "COMPLETION_EXHAUSTED")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        tools: state
            .agent
            .tools()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

/// Main chat endpoint (non-streaming)
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let conversation_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(%conversation_id, "Chat request");

    let mut stream = state.agent.respond(&payload.message);
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.map_err(|e| {
            tracing::error!(%conversation_id, error = %e, "Agent error");
            api_error(&e)
        })?);
    }

    let message = chunks.pop().ok_or_else(|| {
        api_error(&AgentError::Other("agent produced no output".into()))
    })?;

    Ok(Json(ChatResponse {
        message,
        progress: chunks,
        conversation_id,
    }))
}

/// WebSocket streaming chat
pub async fn chat_stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    value: &serde_json::Value,
) -> bool {
    sender
        .send(Message::Text(value.to_string().into()))
        .await
        .is_ok()
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let request: ChatRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.to_string()});
                if !send_json(&mut sender, &error).await {
                    return;
                }
                continue;
            }
        };

        let mut stream = state.agent.respond(&request.message);
        let mut failed = false;
        while let Some(item) = stream.next().await {
            let frame = match item {
                Ok(content) => serde_json::json!({"type": "chunk", "content": content}),
                Err(e) => {
                    tracing::error!(error = %e, "Agent error");
                    failed = true;
                    serde_json::json!({"type": "error", "error": e.user_message()})
                }
            };
            // Dropping the stream here abandons the conversation cooperatively.
            if !send_json(&mut sender, &frame).await {
                return;
            }
        }

        if !failed && !send_json(&mut sender, &serde_json::json!({"type": "done"})).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::provider::Completion;
    use agent_core::{AgentBuilder, GenerationOptions, LlmProvider, Result};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use near_tools::{MockNearClient, register_near_tools};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    struct CannedProvider {
        replies: Mutex<VecDeque<Result<String>>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _messages: &[agent_core::Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Provider("script exhausted".into())))?;
            Ok(Completion::text(reply, options.model.clone()))
        }
    }

    fn state(replies: Vec<Result<String>>, max_prompt_tokens: usize) -> AppState {
        let provider: Arc<dyn LlmProvider> = Arc::new(CannedProvider {
            replies: Mutex::new(replies.into()),
        });
        let mut tools = agent_core::ToolRegistry::new();
        register_near_tools(&mut tools, Arc::new(MockNearClient::default()));

        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tools(tools)
            .max_prompt_tokens(max_prompt_tokens)
            .max_completion_tries(2)
            .verbose(true)
            .build()
            .unwrap();

        AppState {
            agent: Arc::new(agent),
            provider,
        }
    }

    async fn post_chat(state: AppState, message: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::post("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
            .unwrap();
        let response = crate::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_chat_runs_tool_round_trip() {
        let state = state(
            vec![
                Ok(r#"<tool_call>{"name": "mint_near_nft", "arguments": {"receiver": "alice.testnet"}}</tool_call>"#.into()),
                Ok("Your NFT is on its way.".into()),
            ],
            2048,
        );

        let (status, body) = post_chat(state, "mint me an NFT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Your NFT is on its way.");
        assert_eq!(body["progress"].as_array().unwrap().len(), 1);
        assert!(body["conversation_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_chat_exhausted_is_500() {
        let state = state(
            vec![
                Err(AgentError::Provider("down".into())),
                Err(AgentError::Provider("down".into())),
            ],
            2048,
        );

        let (status, body) = post_chat(state, "hello").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "COMPLETION_EXHAUSTED");
    }

    #[tokio::test]
    async fn test_chat_over_budget_is_422() {
        let state = state(vec![Ok("unused".into())], 1);

        let (status, body) = post_chat(state, "please mint me a shiny new NFT").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUDGET_EXCEEDED");
    }

    #[tokio::test]
    async fn test_health_lists_tools() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let response = crate::router(state(vec![], 2048))
            .oneshot(request)
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["provider"], "canned");
        assert_eq!(body["provider_connected"], true);
        assert_eq!(body["tools"][1], "get_testnet_tokens");
    }
}
