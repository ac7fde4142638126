//! Remote executor - runs a tool or raw code in the sandbox
//!
//! Normalizes the service's exit-code/stderr convention into a single
//! [`ExecutionResult`]. Every invocation makes exactly one outbound call; a
//! transport failure is reported as a `Failure` like any other, and whether
//! to retry is left to the model.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::client::{
    CodeExecRequest, ExecutionOutput, FunctionExecRequest, FunctionExecResponse, Language,
    Sandbox, SandboxError, ToolExecRequest,
};
use super::policy::HttpPolicy;
use crate::metrics::{REMOTE_EXECUTIONS, REMOTE_EXECUTION_DURATION};

/// What to run
#[derive(Debug, Clone, Copy)]
pub enum ExecTarget<'a> {
    /// A stored tool, by durable ID
    Tool(&'a str),
    /// A script; its stdout is the result
    Code { code: &'a str, language: Language },
    /// An `execute(input)` function run once without being stored
    Function { code: &'a str, language: Language },
}

impl ExecTarget<'_> {
    fn label(&self) -> &'static str {
        match self {
            ExecTarget::Tool(_) => "tool",
            ExecTarget::Code { .. } => "code",
            ExecTarget::Function { .. } => "function",
        }
    }
}

/// Uniform outcome of a sandbox run
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success(Value),
    Failure(String),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    /// Map a tool/function response: nonzero exit is a failure carrying stderr
    pub fn from_function_response(response: FunctionExecResponse) -> Self {
        let execution = response.execution;
        if execution.exit_code != 0 {
            return ExecutionResult::Failure(failure_text(&execution));
        }
        ExecutionResult::Success(response.output)
    }

    /// Map a script response: success carries stdout
    pub fn from_script_output(output: ExecutionOutput) -> Self {
        if output.exit_code != 0 {
            if output.stderr.trim().is_empty() {
                return ExecutionResult::Failure(
                    serde_json::to_string(&output)
                        .unwrap_or_else(|_| format!("exited with code {}", output.exit_code)),
                );
            }
            return ExecutionResult::Failure(output.stderr);
        }
        ExecutionResult::Success(Value::String(output.stdout))
    }

    pub fn from_transport_error(error: &SandboxError) -> Self {
        ExecutionResult::Failure(format!("Sandbox request failed: {}", error))
    }
}

fn failure_text(execution: &ExecutionOutput) -> String {
    if execution.stderr.trim().is_empty() {
        format!("exited with code {}", execution.exit_code)
    } else {
        execution.stderr.clone()
    }
}

/// Executes tools and code on the sandbox service under a fixed HTTP policy
#[derive(Clone)]
pub struct RemoteExecutor {
    sandbox: Arc<dyn Sandbox>,
    policy: HttpPolicy,
}

impl RemoteExecutor {
    pub fn new(sandbox: Arc<dyn Sandbox>, policy: HttpPolicy) -> Self {
        Self { sandbox, policy }
    }

    pub fn sandbox(&self) -> &Arc<dyn Sandbox> {
        &self.sandbox
    }

    pub fn policy(&self) -> &HttpPolicy {
        &self.policy
    }

    /// Run `target` with `input` and normalize the outcome
    pub async fn execute(&self, target: ExecTarget<'_>, input: Value) -> ExecutionResult {
        let label = target.label();
        let start = Instant::now();

        let result = match target {
            ExecTarget::Tool(id) => {
                let request = ToolExecRequest {
                    input,
                    http: self.policy.clone(),
                };
                self.sandbox
                    .exec_tool(id, &request)
                    .await
                    .map(ExecutionResult::from_function_response)
            }
            ExecTarget::Code { code, language } => {
                let request = CodeExecRequest {
                    code: code.to_string(),
                    language,
                    http: self.policy.clone(),
                };
                self.sandbox
                    .exec_code(&request)
                    .await
                    .map(ExecutionResult::from_script_output)
            }
            ExecTarget::Function { code, language } => {
                let request = FunctionExecRequest {
                    code: code.to_string(),
                    language,
                    input,
                    http: self.policy.clone(),
                };
                self.sandbox
                    .exec_function(&request)
                    .await
                    .map(ExecutionResult::from_function_response)
            }
        };

        REMOTE_EXECUTION_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                let status = if outcome.is_success() { "success" } else { "failure" };
                REMOTE_EXECUTIONS.with_label_values(&[label, status]).inc();
                debug!(target_kind = label, status, "Sandbox execution finished");
                outcome
            }
            Err(e) => {
                REMOTE_EXECUTIONS
                    .with_label_values(&[label, "transport_error"])
                    .inc();
                warn!(target_kind = label, error = %e, "Sandbox request failed");
                ExecutionResult::from_transport_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::client::{CreateToolRequest, RemoteTool, UpdateToolRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> ExecutionOutput {
        ExecutionOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: None,
        }
    }

    #[test]
    fn test_function_response_mapping() {
        let ok = FunctionExecResponse {
            execution: output(0, "", ""),
            output: json!({"temp": 21}),
            output_status: Some("valid".to_string()),
        };
        assert_eq!(
            ExecutionResult::from_function_response(ok),
            ExecutionResult::Success(json!({"temp": 21}))
        );

        let failed = FunctionExecResponse {
            execution: output(1, "", "TypeError: x is undefined"),
            output: Value::Null,
            output_status: None,
        };
        assert_eq!(
            ExecutionResult::from_function_response(failed),
            ExecutionResult::Failure("TypeError: x is undefined".to_string())
        );

        let silent = FunctionExecResponse {
            execution: output(137, "", ""),
            output: Value::Null,
            output_status: None,
        };
        assert_eq!(
            ExecutionResult::from_function_response(silent),
            ExecutionResult::Failure("exited with code 137".to_string())
        );
    }

    #[test]
    fn test_script_output_mapping() {
        assert_eq!(
            ExecutionResult::from_script_output(output(0, "42\n", "")),
            ExecutionResult::Success(json!("42\n"))
        );
        assert_eq!(
            ExecutionResult::from_script_output(output(2, "", "bad")),
            ExecutionResult::Failure("bad".to_string())
        );
        match ExecutionResult::from_script_output(output(3, "partial", "")) {
            ExecutionResult::Failure(text) => assert!(text.contains("\"exit_code\":3")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    /// Records the policy it receives and fails every tool run at the transport level
    #[derive(Default)]
    struct FlakySandbox {
        seen: Mutex<Vec<HttpPolicy>>,
    }

    #[async_trait]
    impl Sandbox for FlakySandbox {
        async fn create_tool(&self, _: &CreateToolRequest) -> Result<RemoteTool, SandboxError> {
            unimplemented!()
        }
        async fn get_tool(&self, _: &str) -> Result<RemoteTool, SandboxError> {
            unimplemented!()
        }
        async fn update_tool(
            &self,
            _: &str,
            _: &UpdateToolRequest,
        ) -> Result<RemoteTool, SandboxError> {
            unimplemented!()
        }
        async fn exec_tool(
            &self,
            _: &str,
            request: &ToolExecRequest,
        ) -> Result<FunctionExecResponse, SandboxError> {
            self.seen.lock().unwrap().push(request.http.clone());
            Err(SandboxError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
        async fn exec_code(&self, request: &CodeExecRequest) -> Result<ExecutionOutput, SandboxError> {
            self.seen.lock().unwrap().push(request.http.clone());
            Ok(output(0, "hi", ""))
        }
        async fn exec_function(
            &self,
            _: &FunctionExecRequest,
        ) -> Result<FunctionExecResponse, SandboxError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failure_and_policy_is_forwarded() {
        let sandbox = Arc::new(FlakySandbox::default());
        let policy = HttpPolicy::allow_all();
        let executor = RemoteExecutor::new(sandbox.clone(), policy.clone());

        let result = executor.execute(ExecTarget::Tool("t_1"), json!({})).await;
        match result {
            ExecutionResult::Failure(text) => assert!(text.contains("503")),
            other => panic!("expected failure, got {:?}", other),
        }

        let result = executor
            .execute(
                ExecTarget::Code {
                    code: "console.log('hi')",
                    language: Language::Typescript,
                },
                Value::Null,
            )
            .await;
        assert_eq!(result, ExecutionResult::Success(json!("hi")));

        let seen = sandbox.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|p| *p == policy));
    }
}
