use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use scoopy_core::domain::session::{Role, Turn};

use crate::llm::{ChatMessage, Completion, LlmClient, LlmError};
use crate::prompt;
use crate::tools::ToolRegistry;

/// A cap on completion/tool rounds per turn. The order flow needs at
/// most one tool round; anything past this is the model cycling.
const MAX_TOOL_ROUNDS: usize = 4;

/// Record of one executed tool call within a turn.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub result: String,
}

/// Outcome of one conversation turn: the assistant's final reply plus
/// every tool call that fired along the way.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

impl TurnOutcome {
    pub fn invoked(&self, tool_name: &str) -> bool {
        self.tool_invocations.iter().any(|invocation| invocation.name == tool_name)
    }

    pub fn saved_order(&self) -> bool {
        self.invoked(prompt::SAVE_ORDER_TOOL_NAME)
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("completion protocol error: {0}")]
    Protocol(String),
    #[error("model exceeded {MAX_TOOL_ROUNDS} tool rounds in one turn")]
    ToolLoopExceeded,
}

impl From<LlmError> for AgentError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Unavailable(message) => Self::ServiceUnavailable(message),
            LlmError::Protocol(message) => Self::Protocol(message),
        }
    }
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        Self { llm, tools }
    }

    /// Runs one turn: fixed instructions + prior turns + the new user
    /// message. If the model asks for a tool, the tool runs
    /// synchronously and its string result is fed back so the model can
    /// produce a final reply incorporating it.
    pub async fn run_turn(
        &self,
        history: &[Turn],
        user_input: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::System(prompt::system_prompt()));
        for turn in history {
            messages.push(match turn.role {
                Role::User => ChatMessage::User(turn.content.clone()),
                Role::Assistant => ChatMessage::Assistant(turn.content.clone()),
            });
        }
        messages.push(ChatMessage::User(user_input.to_string()));

        let specs = self.tools.specs();
        let mut tool_invocations = Vec::new();

        for _round in 0..MAX_TOOL_ROUNDS {
            match self.llm.chat(&messages, &specs).await? {
                Completion::Reply(reply) => {
                    return Ok(TurnOutcome { reply, tool_invocations });
                }
                Completion::ToolCall(call) => {
                    let result = match self.tools.get(&call.name) {
                        Some(tool) => {
                            info!(
                                event_name = "agent.tool.invoked",
                                tool = %call.name,
                                "executing tool requested by model"
                            );
                            tool.execute(call.arguments.clone()).await
                        }
                        None => {
                            warn!(
                                event_name = "agent.tool.unknown",
                                tool = %call.name,
                                "model requested an unregistered tool"
                            );
                            format!("❌ Không có tool tên `{}`.", call.name)
                        }
                    };

                    tool_invocations.push(ToolInvocation {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        result: result.clone(),
                    });

                    messages.push(ChatMessage::AssistantToolCall(call.clone()));
                    messages.push(ChatMessage::ToolResult {
                        call_id: call.id,
                        name: call.name,
                        content: result,
                    });
                }
            }
        }

        Err(AgentError::ToolLoopExceeded)
    }
}
