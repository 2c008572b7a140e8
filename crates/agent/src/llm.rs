use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use scoopy_core::config::{LlmConfig, LlmProvider};

use crate::tools::ToolSpec;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A tool call the model asked for. `arguments` is the parsed JSON
/// object the model supplied.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One entry of the conversation as presented to the completion API.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
    /// The assistant turn that requested a tool call; must precede the
    /// matching `ToolResult` in the transcript.
    AssistantToolCall(ToolCallRequest),
    ToolResult { call_id: String, name: String, content: String },
}

/// What the model produced for one completion round: either a final
/// natural-language reply or a request to invoke a named tool.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Reply(String),
    ToolCall(ToolCallRequest),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),
    #[error("completion service returned an unusable response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, LlmError>;
}

/// OpenAI-compatible chat-completions client. Groq and OpenAI speak
/// this format natively; Ollama exposes the same route under its own
/// base URL.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Self {
        let base_url = match config.provider {
            LlmProvider::Groq => {
                config.base_url.clone().unwrap_or_else(|| GROQ_BASE_URL.to_string())
            }
            LlmProvider::OpenAi => {
                config.base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string())
            }
            LlmProvider::Ollama => {
                let base = config.base_url.clone().unwrap_or_default();
                format!("{}/v1", base.trim_end_matches('/'))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, LlmError> {
        let request = WireRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(WireTool::from).collect())
            },
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let parsed: WireResponse =
            response.json().await.map_err(|err| LlmError::Protocol(err.to_string()))?;
        parsed.into_completion()
    }
}

// ---------------------------------------------------------------------------
// Wire format (OpenAI chat-completions)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object, per the OpenAI wire format.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec,
}

#[derive(Debug, Serialize)]
struct WireFunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        match message {
            ChatMessage::System(content) => Self {
                role: "system",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::User(content) => Self {
                role: "user",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::Assistant(content) => Self {
                role: "assistant",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::AssistantToolCall(call) => Self {
                role: "assistant",
                content: None,
                tool_calls: Some(vec![WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                }]),
                tool_call_id: None,
            },
            ChatMessage::ToolResult { call_id, name: _, content } => Self {
                role: "tool",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            },
        }
    }
}

impl From<&ToolSpec> for WireTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunctionSpec {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl WireResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::Protocol("response contained no choices".to_string()))?;

        if let Some(mut tool_calls) = message.tool_calls.filter(|calls| !calls.is_empty()) {
            let call = tool_calls.remove(0);
            let arguments = serde_json::from_str(&call.function.arguments).map_err(|err| {
                LlmError::Protocol(format!("tool arguments were not valid JSON: {err}"))
            })?;
            return Ok(Completion::ToolCall(ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments,
            }));
        }

        match message.content {
            Some(content) => Ok(Completion::Reply(content)),
            None => Err(LlmError::Protocol("response had neither content nor tool calls".into())),
        }
    }
}
