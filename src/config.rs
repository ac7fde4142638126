//! Command line and environment configuration
//!
//! Every setting can come from a flag or an environment variable; `.env` in
//! the working directory is loaded first. [`Settings`] then builds the pieces
//! the agent loop is assembled from.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::agent::{AgentConfig, SessionStore};
use crate::llm::ChatClient;
use crate::sandbox::{HttpPolicy, PolicyError, RemoteExecutor, RizaClient};
use crate::tools::BuiltinTool;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set (export it or add it to .env)")]
    MissingKey(&'static str),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("Failed to open session directory: {0}")]
    Sessions(#[from] std::io::Error),
}

/// A self-learning agent that writes its own tools
#[derive(Debug, Clone, Parser)]
#[command(name = "toolsmith", version, about)]
pub struct Settings {
    /// Saved agent to resume (starts fresh when omitted)
    pub session: Option<String>,

    /// Keep `create_tool` available when resuming a saved agent
    #[arg(long)]
    pub learn: bool,

    /// Stream model responses over server-sent events
    #[arg(long, env = "TOOLSMITH_STREAM")]
    pub stream: bool,

    #[arg(long, env = "TOOLSMITH_MODEL", default_value = "claude-3-5-sonnet-20240620")]
    pub model: String,

    #[arg(long, env = "TOOLSMITH_MAX_TOKENS", default_value_t = 1024)]
    pub max_tokens: u32,

    /// First message to send before asking for input
    #[arg(long)]
    pub prompt: Option<String>,

    /// Offer every built-in tool, not just the default set
    #[arg(long)]
    pub all_builtins: bool,

    /// Directory of saved agents (default: ~/.toolsmith/saved-agents)
    #[arg(long, env = "TOOLSMITH_SESSIONS_DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// JSON allow-list merged over the credentials found in the environment
    #[arg(long, value_name = "FILE")]
    pub http_policy: Option<PathBuf>,

    /// Let sandboxed code reach any host
    #[arg(long)]
    pub allow_all_hosts: bool,

    /// List saved agents and exit
    #[arg(long)]
    pub list: bool,

    /// Return control to the operator after this many tool rounds
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Abandon a model call after this many seconds
    #[arg(long)]
    pub model_timeout_secs: Option<u64>,

    /// OTLP collector endpoint; tracing export is off when unset
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    pub print_metrics: bool,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = ChatClient::DEFAULT_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "RIZA_API_KEY", hide_env_values = true)]
    pub riza_api_key: Option<String>,

    #[arg(long, env = "RIZA_BASE_URL", default_value = RizaClient::DEFAULT_BASE_URL)]
    pub riza_base_url: String,
}

impl Settings {
    /// Load `.env`, then parse flags and environment
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("Warning: failed to load .env: {}", e);
            }
        }
        Self::parse()
    }

    pub fn agent_config(&self) -> AgentConfig {
        let builtins = if self.all_builtins {
            BuiltinTool::ALL.to_vec()
        } else {
            BuiltinTool::DEFAULT_SET.to_vec()
        };
        AgentConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system_prompt: None,
            // A resumed agent keeps its tool set fixed unless asked to keep learning
            allow_tool_creation: self.session.is_none() || self.learn,
            builtins,
            max_tool_rounds: self.max_tool_rounds.filter(|n| *n > 0),
            model_timeout: self.model_timeout_secs.map(Duration::from_secs),
            initial_prompt: self.prompt.clone(),
        }
    }

    pub fn chat_client(&self) -> Result<ChatClient, ConfigError> {
        let key = required(&self.anthropic_api_key, "ANTHROPIC_API_KEY")?;
        Ok(ChatClient::new(key)
            .with_base_url(&self.anthropic_base_url)
            .with_streaming(self.stream))
    }

    pub fn sandbox_client(&self) -> Result<RizaClient, ConfigError> {
        let key = required(&self.riza_api_key, "RIZA_API_KEY")?;
        Ok(RizaClient::new(key).with_base_url(&self.riza_base_url))
    }

    pub fn http_policy(&self) -> Result<HttpPolicy, ConfigError> {
        let mut policy = HttpPolicy::from_env();
        if self.allow_all_hosts {
            policy = policy.merge(HttpPolicy::allow_all());
        }
        if let Some(path) = &self.http_policy {
            policy = policy.merge(HttpPolicy::load_file(path)?);
        }
        Ok(policy)
    }

    pub fn executor(&self) -> Result<RemoteExecutor, ConfigError> {
        Ok(RemoteExecutor::new(
            Arc::new(self.sandbox_client()?),
            self.http_policy()?,
        ))
    }

    pub fn session_store(&self) -> Result<SessionStore, ConfigError> {
        let store = match &self.sessions_dir {
            Some(dir) => SessionStore::new(dir)?,
            None => SessionStore::default_store()?,
        };
        Ok(store)
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingKey(name))
}
