//! HTTP client for the remote code-execution service
//!
//! The service stores tool programs under durable IDs and runs them (or raw
//! scripts) in an isolated sandbox. Outbound network access from the sandbox
//! is governed by an [`HttpPolicy`] supplied with every call.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::policy::HttpPolicy;
use crate::tools::ToolResolver;

/// Language of a raw script or function run (`/v1/execute*` endpoints)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(alias = "TYPESCRIPT")]
    Typescript,
    #[serde(alias = "JAVASCRIPT")]
    Javascript,
    #[serde(alias = "PYTHON")]
    Python,
}

/// Language of a stored tool (`/v1/tools` endpoints)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolLanguage {
    #[default]
    #[serde(alias = "typescript")]
    Typescript,
    #[serde(alias = "python")]
    Python,
}

fn empty_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// A tool program stored on the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
    #[serde(default)]
    pub language: ToolLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateToolRequest {
    pub name: String,
    pub description: String,
    pub code: String,
    pub input_schema: Value,
    pub language: ToolLanguage,
}

/// Partial update; omitted fields keep their current value
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateToolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<ToolLanguage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolExecRequest {
    pub input: Value,
    pub http: HttpPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeExecRequest {
    pub code: String,
    pub language: Language,
    pub http: HttpPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionExecRequest {
    pub code: String,
    pub language: Language,
    pub input: Value,
    pub http: HttpPolicy,
}

/// Process-level outcome of a sandbox run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub exit_code: i32,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

/// Response of a tool or function run: process outcome plus parsed output
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionExecResponse {
    pub execution: ExecutionOutput,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub output_status: Option<String>,
}

/// Error type for sandbox service calls
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Sandbox service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid tool id '{0}'")]
    InvalidToolId(String),
}

/// The remote code-execution service
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn create_tool(&self, request: &CreateToolRequest) -> Result<RemoteTool, SandboxError>;

    async fn get_tool(&self, id: &str) -> Result<RemoteTool, SandboxError>;

    async fn update_tool(
        &self,
        id: &str,
        request: &UpdateToolRequest,
    ) -> Result<RemoteTool, SandboxError>;

    async fn exec_tool(
        &self,
        id: &str,
        request: &ToolExecRequest,
    ) -> Result<FunctionExecResponse, SandboxError>;

    async fn exec_code(&self, request: &CodeExecRequest) -> Result<ExecutionOutput, SandboxError>;

    async fn exec_function(
        &self,
        request: &FunctionExecRequest,
    ) -> Result<FunctionExecResponse, SandboxError>;
}

/// Adapts any [`Sandbox`] into the resolver used when restoring sessions
pub struct SandboxResolver<'a>(pub &'a dyn Sandbox);

#[async_trait]
impl ToolResolver for SandboxResolver<'_> {
    async fn resolve(&self, id: &str) -> Result<RemoteTool, SandboxError> {
        self.0.get_tool(id).await
    }
}

/// Client for the Riza-compatible sandbox HTTP API
#[derive(Clone)]
pub struct RizaClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RizaClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.riza.io";

    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - Bearer token for the service
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// `/tools/{id}{suffix}`. IDs come from session files, so anything that
    /// could change the path is rejected.
    fn tool_path(id: &str, suffix: &str) -> Result<String, SandboxError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SandboxError::InvalidToolId(id.to_string()));
        }
        Ok(format!("/tools/{}{}", id, suffix))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SandboxError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, SandboxError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, SandboxError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SandboxError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl Sandbox for RizaClient {
    async fn create_tool(&self, request: &CreateToolRequest) -> Result<RemoteTool, SandboxError> {
        self.post("/tools", request).await
    }

    async fn get_tool(&self, id: &str) -> Result<RemoteTool, SandboxError> {
        self.get(&Self::tool_path(id, "")?).await
    }

    async fn update_tool(
        &self,
        id: &str,
        request: &UpdateToolRequest,
    ) -> Result<RemoteTool, SandboxError> {
        self.post(&Self::tool_path(id, "")?, request).await
    }

    async fn exec_tool(
        &self,
        id: &str,
        request: &ToolExecRequest,
    ) -> Result<FunctionExecResponse, SandboxError> {
        self.post(&Self::tool_path(id, "/execute")?, request)
            .await
    }

    async fn exec_code(&self, request: &CodeExecRequest) -> Result<ExecutionOutput, SandboxError> {
        self.post("/execute", request).await
    }

    async fn exec_function(
        &self,
        request: &FunctionExecRequest,
    ) -> Result<FunctionExecResponse, SandboxError> {
        self.post("/execute-function", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_wire_names() {
        assert_eq!(serde_json::to_value(Language::Typescript).unwrap(), "typescript");
        assert_eq!(serde_json::to_value(ToolLanguage::Python).unwrap(), "PYTHON");

        let lang: Language = serde_json::from_value(serde_json::json!("PYTHON")).unwrap();
        assert_eq!(lang, Language::Python);
        let lang: ToolLanguage = serde_json::from_value(serde_json::json!("typescript")).unwrap();
        assert_eq!(lang, ToolLanguage::Typescript);
    }

    #[test]
    fn test_remote_tool_parses_service_object() {
        let tool: RemoteTool = serde_json::from_str(
            r#"{
                "id": "t_123",
                "name": "get_weather",
                "description": "Weather by city",
                "code": "function execute(input) { return {}; }",
                "input_schema": {"type": "object", "properties": {"city": {"type": "string"}}},
                "language": "TYPESCRIPT",
                "revision_id": "rev_1"
            }"#,
        )
        .unwrap();

        assert_eq!(tool.id, "t_123");
        assert_eq!(tool.language, ToolLanguage::Typescript);
        assert_eq!(tool.revision_id.as_deref(), Some("rev_1"));
    }

    #[test]
    fn test_update_request_omits_unset_fields() {
        let request = UpdateToolRequest {
            code: Some("function execute() {}".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"code": "function execute() {}"}));
    }

    #[test]
    fn test_function_response_defaults() {
        let response: FunctionExecResponse = serde_json::from_str(
            r#"{"execution": {"exit_code": 1, "stderr": "boom"}}"#,
        )
        .unwrap();
        assert_eq!(response.execution.exit_code, 1);
        assert_eq!(response.execution.stdout, "");
        assert!(response.output.is_null());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RizaClient::new("key").with_base_url("http://localhost:8080/");
        assert_eq!(client.endpoint("/tools"), "http://localhost:8080/v1/tools");
    }

    #[test]
    fn test_tool_ids_cannot_escape_the_tool_path() {
        assert_eq!(
            RizaClient::tool_path("tool_01J-abc", "/execute").unwrap(),
            "/tools/tool_01J-abc/execute"
        );
        for id in ["", "../execute", "a/b", "t?x=1", "t#frag", "t%2F", "t 1"] {
            assert!(
                matches!(RizaClient::tool_path(id, ""), Err(SandboxError::InvalidToolId(_))),
                "{:?} accepted",
                id
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_tool_id_fails_before_any_request() {
        // Nothing listens here; a request would fail with a different error
        let client = RizaClient::new("key").with_base_url("http://127.0.0.1:9");
        let err = client.get_tool("../execute").await.unwrap_err();
        assert!(matches!(err, SandboxError::InvalidToolId(ref id) if id == "../execute"));
    }
}
