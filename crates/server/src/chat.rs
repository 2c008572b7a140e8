//! The conversational endpoint.
//!
//! `POST /chat` runs one turn: resolve the session token, persist the
//! user message, let the model (and its tools) produce a reply, persist
//! that too, then hand back whichever token the next turn should use.
//! A completed order swaps the token for a fresh one.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use scoopy_agent::runtime::{AgentError, AgentRuntime};
use scoopy_core::config::ServerConfig;
use scoopy_core::domain::session::{Role, SessionId, Turn};
use scoopy_core::errors::{ApplicationError, InterfaceError};

use crate::sessions::SessionService;

#[derive(Clone)]
pub struct ChatState {
    pub sessions: Arc<SessionService>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_uuid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_uuid: String,
}

#[derive(Debug, Serialize)]
pub struct ChatErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// Carries an `InterfaceError` out of the handler. Detail goes to the
/// logs; the wire body only gets the generic user message.
pub struct ChatFailure(InterfaceError);

impl IntoResponse for ChatFailure {
    fn into_response(self) -> Response {
        let (status, correlation_id) = match &self.0 {
            InterfaceError::BadRequest { correlation_id, .. } => {
                (StatusCode::BAD_REQUEST, correlation_id.clone())
            }
            InterfaceError::ServiceUnavailable { correlation_id, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, correlation_id.clone())
            }
            InterfaceError::Internal { correlation_id, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, correlation_id.clone())
            }
        };
        let body =
            ChatErrorBody { error: self.0.user_message().to_string(), correlation_id };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ChatState, cors: CorsLayer) -> Router {
    Router::new().route("/chat", post(chat)).layer(cors).with_state(state)
}

/// Builds the CORS layer from the configured origin list. A literal
/// `*` entry opens the endpoint to any origin.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(
                        event_name = "server.cors.invalid_origin",
                        origin = %origin,
                        "ignoring unparseable CORS origin"
                    );
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatFailure> {
    let correlation_id = Uuid::new_v4().to_string();

    if request.message.trim().is_empty() {
        return Err(ChatFailure(InterfaceError::BadRequest {
            message: "message must not be blank".to_string(),
            correlation_id,
        }));
    }

    let requested = request.session_uuid.map(SessionId);
    let session_id = state
        .sessions
        .resolve_or_create(requested)
        .await
        .map_err(|error| fail(error, &correlation_id))?;

    // Holding the session's history guard for the whole turn serializes
    // concurrent requests on the same token without touching others.
    let mut history = state.sessions.memory().lock(&session_id).await;

    state
        .sessions
        .append(&session_id, Role::User, &request.message)
        .await
        .map_err(|error| fail(error, &correlation_id))?;

    let outcome = state
        .runtime
        .run_turn(history.as_slice(), &request.message)
        .await
        .map_err(|error| fail_agent(error, &correlation_id, &session_id))?;

    state
        .sessions
        .append(&session_id, Role::Assistant, &outcome.reply)
        .await
        .map_err(|error| fail(error, &correlation_id))?;

    history.push(Turn::user(request.message.clone()));
    history.push(Turn::assistant(outcome.reply.clone()));
    drop(history);

    let next_token = if state.sessions.should_reset(&outcome) {
        state.sessions.reset(&session_id).await.map_err(|error| fail(error, &correlation_id))?
    } else {
        session_id
    };

    info!(
        event_name = "chat.turn_completed",
        correlation_id = %correlation_id,
        session_id = %next_token,
        tool_invocations = outcome.tool_invocations.len(),
        "turn completed"
    );

    Ok(Json(ChatResponse { response: outcome.reply, session_uuid: next_token.0 }))
}

fn fail(error: ApplicationError, correlation_id: &str) -> ChatFailure {
    error!(
        event_name = "chat.turn_failed",
        correlation_id = %correlation_id,
        error = %error,
        "turn aborted"
    );
    ChatFailure(error.into_interface(correlation_id))
}

fn fail_agent(error: AgentError, correlation_id: &str, session_id: &SessionId) -> ChatFailure {
    error!(
        event_name = "chat.completion_failed",
        correlation_id = %correlation_id,
        session_id = %session_id,
        error = %error,
        "completion failed"
    );
    // All three are transient service conditions: the completion API is
    // down, speaking garbage, or cycling. None implicate our config.
    let mapped = match error {
        AgentError::ServiceUnavailable(message) => ApplicationError::ServiceUnavailable(message),
        AgentError::Protocol(message) => ApplicationError::ServiceUnavailable(message),
        AgentError::ToolLoopExceeded => ApplicationError::ServiceUnavailable(error.to_string()),
    };
    ChatFailure(mapped.into_interface(correlation_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use scoopy_agent::llm::{ChatMessage, Completion, LlmClient, LlmError, ToolCallRequest};
    use scoopy_agent::runtime::AgentRuntime;
    use scoopy_agent::tools::{ToolRegistry, ToolSpec};
    use scoopy_core::config::{ResetPolicy, ServerConfig};
    use scoopy_core::domain::session::SessionId;
    use scoopy_db::repositories::{
        InMemoryMessageRepository, InMemoryOrderRepository, InMemorySessionRepository,
        MessageRepository,
    };
    use scoopy_notify::NoopNotifier;

    use crate::orders::SaveOrderTool;
    use crate::sessions::SessionService;

    use super::{cors_layer, router, ChatState};

    struct ScriptedLlm {
        script: Mutex<Vec<Result<Completion, LlmError>>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<Completion, LlmError> {
            let mut script = self.script.lock().await;
            if script.is_empty() {
                return Err(LlmError::Protocol("script exhausted".to_string()));
            }
            script.remove(0)
        }
    }

    struct Harness {
        sessions: Arc<SessionService>,
        messages: Arc<InMemoryMessageRepository>,
        orders: Arc<InMemoryOrderRepository>,
        router: axum::Router,
    }

    fn harness(script: Vec<Result<Completion, LlmError>>) -> Harness {
        let messages = Arc::new(InMemoryMessageRepository::default());
        let orders = Arc::new(InMemoryOrderRepository::default());
        let sessions = Arc::new(SessionService::new(
            Arc::new(InMemorySessionRepository::default()),
            messages.clone(),
            ResetPolicy::ToolSignal,
        ));

        let mut tools = ToolRegistry::default();
        tools.register(SaveOrderTool::new(orders.clone(), Arc::new(NoopNotifier)));
        let runtime = Arc::new(AgentRuntime::new(
            Arc::new(ScriptedLlm { script: Mutex::new(script) }),
            tools,
        ));

        let state = ChatState { sessions: sessions.clone(), runtime };
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: vec!["*".to_string()],
            graceful_shutdown_secs: 5,
        };
        let router = router(state, cors_layer(&config));

        Harness { sessions, messages, orders, router }
    }

    async fn post_chat(router: &axum::Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    fn save_order_call() -> Completion {
        Completion::ToolCall(ToolCallRequest {
            id: "call_1".to_string(),
            name: "save_order".to_string(),
            arguments: json!({
                "customer_name": "Lan",
                "phone": "0901234567",
                "items": "1 kem ốc quế",
                "order_type": "Mang về"
            }),
        })
    }

    #[tokio::test]
    async fn first_turn_mints_a_token_and_persists_both_messages() {
        let harness = harness(vec![Ok(Completion::Reply("Dạ, bạn muốn dùng gì ạ?".to_string()))]);

        let (status, body) = post_chat(&harness.router, json!({"message": "xin chào"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Dạ, bạn muốn dùng gì ạ?");
        let token = body["session_uuid"].as_str().expect("token").to_string();

        let stored = harness
            .messages
            .list_for_session(&SessionId(token))
            .await
            .expect("list");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "xin chào");
        assert_eq!(stored[1].content, "Dạ, bạn muốn dùng gì ạ?");
    }

    #[tokio::test]
    async fn known_token_carries_context_and_stays_stable() {
        let harness = harness(vec![
            Ok(Completion::Reply("bạn tên gì ạ?".to_string())),
            Ok(Completion::Reply("chào Lan!".to_string())),
        ]);

        let (_, first) = post_chat(&harness.router, json!({"message": "cho 1 trà đào"})).await;
        let token = first["session_uuid"].as_str().expect("token").to_string();

        let (status, second) =
            post_chat(&harness.router, json!({"message": "tên Lan", "session_uuid": token})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["session_uuid"].as_str().expect("token"), token);

        let memory =
            harness.sessions.memory().snapshot(&SessionId(token)).await;
        assert_eq!(memory.len(), 4, "both turns live in transient memory");
    }

    #[tokio::test]
    async fn saved_order_resets_the_session() {
        let harness = harness(vec![
            Ok(save_order_call()),
            Ok(Completion::Reply("Cảm ơn Lan, hẹn gặp lại!".to_string())),
        ]);

        let (_, opening) = post_chat(&harness.router, json!({"message": "đặt như trên"})).await;
        // The save happened on this very turn, so the handed-back token
        // is already the successor and its memory starts empty.
        let successor = opening["session_uuid"].as_str().expect("token").to_string();
        assert_eq!(harness.orders.all().await.len(), 1);
        assert!(harness.sessions.memory().snapshot(&SessionId(successor)).await.is_empty());
    }

    #[tokio::test]
    async fn reset_token_differs_from_the_one_sent() {
        let harness = harness(vec![
            Ok(Completion::Reply("bạn xác nhận nhé?".to_string())),
            Ok(save_order_call()),
            Ok(Completion::Reply("Cảm ơn Lan!".to_string())),
        ]);

        let (_, first) = post_chat(&harness.router, json!({"message": "cho 1 kem ốc quế"})).await;
        let token = first["session_uuid"].as_str().expect("token").to_string();

        let (status, second) = post_chat(
            &harness.router,
            json!({"message": "Đúng rồi", "session_uuid": token}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let next = second["session_uuid"].as_str().expect("token");
        assert_ne!(next, token, "a completed order must rotate the token");
        assert!(harness.sessions.memory().snapshot(&SessionId(next.to_string())).await.is_empty());
        assert_eq!(harness.orders.all().await.len(), 1);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let harness = harness(Vec::new());
        let (status, body) = post_chat(&harness.router, json!({"message": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["correlation_id"].as_str().is_some());
        assert!(harness.orders.all().await.is_empty());
    }

    #[tokio::test]
    async fn completion_outage_maps_to_service_unavailable() {
        let harness =
            harness(vec![Err(LlmError::Unavailable("connection refused".to_string()))]);
        let (status, body) = post_chat(&harness.router, json!({"message": "xin chào"})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["error"],
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[tokio::test]
    async fn runaway_tool_cycling_maps_to_service_unavailable() {
        let script = (0..8)
            .map(|_| {
                Ok(Completion::ToolCall(ToolCallRequest {
                    id: "call_1".to_string(),
                    name: "lookup_menu".to_string(),
                    arguments: json!({}),
                }))
            })
            .collect();
        let harness = harness(script);

        let (status, body) = post_chat(&harness.router, json!({"message": "xin chào"})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["error"],
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert!(harness.orders.all().await.is_empty());
    }

    #[tokio::test]
    async fn preflight_is_answered() {
        let harness = harness(Vec::new());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(header::ORIGIN, "https://shop.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .expect("request");
        let response = harness.router.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
