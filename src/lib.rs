//! toolsmith - a self-learning agent that writes its own tools
//!
//! The agent converses with an LLM through a registry of tools. A few are
//! built in; the rest the model writes itself at runtime. Those are stored
//! on a remote code-execution sandbox and referenced by durable IDs, so an
//! agent can be saved and later resumed with everything it has learned.
//!
//! # Modules
//!
//! - `tools` - Tool registry and built-in tool manifest
//! - `sandbox` - Remote sandbox client, executor and HTTP credential policy
//! - `llm` - Messages API client with batch and streaming responses
//! - `agent` - Conversation state, the agent loop and saved agents
//! - `config` - CLI flags and environment
//! - `telemetry` - Tracing subscriber and optional OTLP export
//! - `metrics` - Prometheus metrics for observability
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use toolsmith::{AgentConfig, AgentLoop, ChatClient, HttpPolicy, RemoteExecutor, RizaClient, SessionStore, StdConsole};
//!
//! let model = Arc::new(ChatClient::new(anthropic_key));
//! let executor = RemoteExecutor::new(Arc::new(RizaClient::new(riza_key)), HttpPolicy::from_env());
//! let mut agent = AgentLoop::new(model, executor, SessionStore::default_store()?, Box::new(StdConsole::new()), AgentConfig::default())?;
//! agent.run().await?;
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod sandbox;
pub mod telemetry;
pub mod tools;

// Re-export commonly used types at crate root for convenience
pub use agent::{AgentConfig, AgentError, AgentLoop, LoopState, SessionStore, StdConsole};
pub use llm::{ChatClient, LanguageModel};
pub use sandbox::{ExecTarget, ExecutionResult, HttpPolicy, RemoteExecutor, RizaClient, Sandbox};
pub use tools::{ToolDefinition, ToolRegistry};
