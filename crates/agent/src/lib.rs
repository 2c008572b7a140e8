//! Agent orchestration - the conversational "brain" of scoopy.
//!
//! This crate drives one conversation turn at a time:
//! 1. **Prompting** (`prompt`) - fixed order-taking instructions + menu
//! 2. **Completion** (`llm`) - provider-agnostic chat-completions client
//! 3. **Tool execution** (`tools`) - the model may elect to call
//!    `save_order`; the result is fed back before the final reply
//! 4. **Transient memory** (`memory`) - per-session turn history
//!
//! # Key Types
//!
//! - `AgentRuntime` - per-turn orchestrator (see `runtime` module)
//! - `LlmClient` - pluggable trait for Groq/OpenAI/Ollama
//! - `Completion` - explicit sum type: a reply or a tool-call request
//!
//! The runtime never persists anything directly. Whether an order gets
//! saved is decided by the model through the registered tool; the
//! runtime only records that the tool fired so the session lifecycle
//! can react to it.

pub mod llm;
pub mod memory;
pub mod prompt;
pub mod runtime;
pub mod tools;

pub use llm::{ChatMessage, Completion, LlmClient, ToolCallRequest};
pub use memory::TurnMemory;
pub use runtime::{AgentError, AgentRuntime, ToolInvocation, TurnOutcome};
pub use tools::{Tool, ToolRegistry, ToolSpec};
