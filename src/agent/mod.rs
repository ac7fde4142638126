//! Agent module for the self-learning tool loop
//!
//! This module provides the loop that orchestrates:
//! - the LLM, called with the live tool manifest
//! - the tool registry, which grows as the model writes tools
//! - the remote sandbox, where every non-builtin tool runs
//! - the operator console and saved agents
//!
//! # Architecture
//!
//! ```text
//! Operator → AgentLoop → LanguageModel.respond(system, messages, tools)
//!                  ↓
//!           tool_use blocks (in order)
//!                  ↓
//!           ToolRegistry.lookup(name)
//!             ├─ Hardcoded → built-in handler (create_tool, request_user_input, ...)
//!             └─ Remote    → RemoteExecutor.execute(Tool(id), input)
//!                  ↓
//!           tool_result appended → next model call
//!                  ↓
//!           "save" → SessionStore writes {name, rizaTools, prompt?}
//! ```

pub mod console;
pub mod controller;
pub mod conversation;
pub mod sessions;

pub use console::{Console, ScriptedConsole, StdConsole};
pub use controller::{
    AgentConfig, AgentError, AgentLoop, LoopState, PendingToolUse, EXIT_COMMAND, SAVE_COMMAND,
};
pub use conversation::{ConversationError, ConversationState, Message, Role};
pub use sessions::{timestamp_name, SessionError, SessionSnapshot, SessionStore, SessionSummary};
