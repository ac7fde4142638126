//! Remote sandbox integration
//!
//! Tool programs written by the agent live on a remote code-execution
//! service. Nothing the model writes ever runs locally.
//!
//! # Architecture
//!
//! ```text
//! AgentLoop ──► RemoteExecutor.execute(target, input)
//!                    │  (+ HttpPolicy allow-list)
//!                    ▼
//!               dyn Sandbox ──► RizaClient ──HTTPS──► /v1/tools/{id}/execute
//!                    │                               /v1/execute
//!                    ▼                               /v1/execute-function
//!      {exit_code, stdout, stderr, output}
//!                    │
//!                    ▼
//!      ExecutionResult::Success(output) | Failure(stderr)
//! ```

pub mod client;
pub mod executor;
pub mod policy;

pub use client::{
    CodeExecRequest, CreateToolRequest, ExecutionOutput, FunctionExecRequest,
    FunctionExecResponse, Language, RemoteTool, RizaClient, Sandbox, SandboxError,
    SandboxResolver, ToolExecRequest, ToolLanguage, UpdateToolRequest,
};
pub use executor::{ExecTarget, ExecutionResult, RemoteExecutor};
pub use policy::{AllowRule, HostAuth, HttpPolicy, PolicyError};
