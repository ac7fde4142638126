//! Agent loop - the state machine driving the model, the tools and the operator
//!
//! One [`AgentLoop`] owns one conversation and one tool registry. Each call to
//! [`AgentLoop::step`] performs exactly one transition:
//!
//! ```text
//! AwaitingUserInput ──line──► AwaitingModelResponse ──no tool use──► AwaitingUserInput
//!        │                          │        ▲
//!   save/exit/EOF               tool use     │ all results appended
//!        ▼                          ▼        │
//!     Terminal ◄──save──── ProcessingToolUse(pending)
//! ```
//!
//! Tool uses run one at a time in the order the model emitted them, and every
//! processed tool use gets exactly one result before the next model call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::console::Console;
use super::conversation::{ConversationError, ConversationState, Message};
use super::sessions::{record_save, timestamp_name, SessionError, SessionSnapshot, SessionStore};
use crate::llm::{ChatError, LanguageModel, ModelRequest, ModelTurn};
use crate::metrics::{set_registered_tools, MODEL_CALLS, MODEL_CALL_DURATION, TOOL_CALLS};
use crate::sandbox::{
    CreateToolRequest, ExecTarget, ExecutionResult, RemoteExecutor, SandboxResolver,
    UpdateToolRequest,
};
use crate::tools::builtin::{
    CreateToolInput, EditToolInput, ExecuteCodeInput, ExecuteFunctionInput, FetchToolInput,
    SaveAgentInput, ShowOptionsInput, UseToolInput,
};
use crate::tools::{BuiltinTool, RegistryError, ToolDefinition, ToolRegistry, DEFAULT_SYSTEM_PROMPT};

/// Operator command that saves the agent and ends the session
pub const SAVE_COMMAND: &str = "save";
/// Operator command that ends the session without saving
pub const EXIT_COMMAND: &str = "exit";

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model name sent with every request
    pub model: String,
    /// Response token limit per model call
    pub max_tokens: u32,
    /// Custom system prompt (uses default if None)
    pub system_prompt: Option<String>,
    /// Whether `create_tool` is offered. Off for a fixed tool set.
    pub allow_tool_creation: bool,
    /// Built-in tools to register
    pub builtins: Vec<BuiltinTool>,
    /// Tool rounds allowed without operator input (None = unlimited)
    pub max_tool_rounds: Option<usize>,
    /// Upper bound on a single model call
    pub model_timeout: Option<Duration>,
    /// First user message, sent before asking the operator for anything
    pub initial_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 1024,
            system_prompt: None,
            allow_tool_creation: true,
            builtins: BuiltinTool::DEFAULT_SET.to_vec(),
            max_tool_rounds: None,
            model_timeout: None,
            initial_prompt: None,
        }
    }
}

impl AgentConfig {
    /// Built-ins to register once the tool creation flag is applied
    pub fn active_builtins(&self) -> Vec<BuiltinTool> {
        self.builtins
            .iter()
            .copied()
            .filter(|builtin| self.allow_tool_creation || !builtin.is_learning())
            .collect()
    }
}

/// A tool use the model asked for that has not been answered yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingUserInput,
    AwaitingModelResponse,
    ProcessingToolUse(Vec<PendingToolUse>),
    Terminal,
}

/// Error type for agent operations
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    Model(#[from] ChatError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Failed to restore saved agent: {0}")]
    Restore(#[source] RegistryError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Console error: {0}")]
    Console(#[from] std::io::Error),
}

/// How a tool use was answered
#[derive(Debug)]
enum ToolReply {
    Ok(String),
    Err(String),
    /// The operator saved or quit while the tool was waiting on them
    Terminate,
}

impl From<ExecutionResult> for ToolReply {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success(Value::String(text)) => ToolReply::Ok(text),
            ExecutionResult::Success(value) => ToolReply::Ok(value.to_string()),
            ExecutionResult::Failure(error) => ToolReply::Err(error),
        }
    }
}

/// What the operator typed at a prompt
enum OperatorInput {
    Line(String),
    Terminate,
}

/// The agent loop
pub struct AgentLoop {
    model: Arc<dyn LanguageModel>,
    executor: RemoteExecutor,
    registry: ToolRegistry,
    conversation: ConversationState,
    console: Box<dyn Console>,
    store: SessionStore,
    config: AgentConfig,
    state: LoopState,
    tool_rounds: usize,
    trace_id: String,
}

impl AgentLoop {
    /// Create a fresh agent with only the built-in tools
    ///
    /// # Arguments
    /// * `model` - LLM used for every turn
    /// * `executor` - Sandbox executor for remote tools and code
    /// * `store` - Where `save` and `save_agent` write snapshots
    /// * `console` - Operator input and output
    /// * `config` - Agent configuration
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: RemoteExecutor,
        store: SessionStore,
        console: Box<dyn Console>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        let registry = ToolRegistry::with_builtins(&config.active_builtins())?;
        let mut agent = Self {
            model,
            executor,
            registry,
            conversation: ConversationState::new(),
            console,
            store,
            config,
            state: LoopState::AwaitingUserInput,
            tool_rounds: 0,
            trace_id: Uuid::now_v7().to_string(),
        };

        if let Some(prompt) = agent.config.initial_prompt.clone() {
            agent.push(Message::user(prompt))?;
            agent.state = LoopState::AwaitingModelResponse;
        }
        agent.record_registry();
        Ok(agent)
    }

    /// Rebuild a saved agent: re-fetch its tools, then replay its prompt.
    ///
    /// Fails without starting if any saved tool cannot be fetched.
    pub async fn resume(
        model: Arc<dyn LanguageModel>,
        executor: RemoteExecutor,
        store: SessionStore,
        console: Box<dyn Console>,
        mut config: AgentConfig,
        snapshot: &SessionSnapshot,
    ) -> Result<Self, AgentError> {
        let mut registry = ToolRegistry::with_builtins(&config.active_builtins())?;
        let restored = registry
            .restore(snapshot, &SandboxResolver(executor.sandbox().as_ref()))
            .await
            .map_err(AgentError::Restore)?;
        info!(name = %snapshot.name, restored, "Restored saved agent");

        if snapshot.prompt.is_some() {
            config.initial_prompt = snapshot.prompt.clone();
        }
        let mut agent = Self::new(model, executor, store, console, config)?;
        agent.registry = registry;
        agent.record_registry();
        Ok(agent)
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn is_terminal(&self) -> bool {
        self.state == LoopState::Terminal
    }

    /// Step until the session ends
    pub async fn run(&mut self) -> Result<(), AgentError> {
        let root_span = info_span!(
            "agent_session",
            trace_id = %self.trace_id,
            model = %self.config.model,
            otel.name = "agent_session"
        );

        async {
            info!(trace_id = %self.trace_id, tools = self.registry.len(), "Starting agent loop");
            self.console.show(&format!("[AGENT] Trace ID: {}", self.trace_id));
            while !self.is_terminal() {
                self.step().await?;
            }
            info!(messages = self.conversation.len(), "Agent loop finished");
            Ok(())
        }
        .instrument(root_span)
        .await
    }

    /// Perform exactly one state transition.
    ///
    /// On error the state is left as it was before the call.
    pub async fn step(&mut self) -> Result<(), AgentError> {
        let state = std::mem::replace(&mut self.state, LoopState::Terminal);
        match state {
            LoopState::AwaitingUserInput => match self.read_operator("[You]:").await {
                Ok(OperatorInput::Line(text)) => {
                    self.tool_rounds = 0;
                    if let Err(e) = self.push(Message::user(text)) {
                        self.state = LoopState::AwaitingUserInput;
                        return Err(e);
                    }
                    self.state = LoopState::AwaitingModelResponse;
                }
                Ok(OperatorInput::Terminate) => self.state = LoopState::Terminal,
                Err(e) => {
                    self.state = LoopState::AwaitingUserInput;
                    return Err(e);
                }
            },
            LoopState::AwaitingModelResponse => {
                let turn = match self.call_model().await {
                    Ok(turn) => turn,
                    Err(e) => {
                        self.state = LoopState::AwaitingModelResponse;
                        return Err(e);
                    }
                };
                match self.apply_turn(turn) {
                    Ok(next) => self.state = next,
                    Err(e) => {
                        self.state = LoopState::AwaitingModelResponse;
                        return Err(e);
                    }
                }
            }
            LoopState::ProcessingToolUse(pending) => {
                self.state = self.process_tool_uses(pending).await?;
            }
            LoopState::Terminal => {}
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Model turns
    // ─────────────────────────────────────────────────────────────────────────

    async fn call_model(&self) -> Result<ModelTurn, AgentError> {
        let request = ModelRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: Some(
                self.config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            messages: self.conversation.to_model_format(),
            tools: self.registry.list_for_model(),
        };

        let llm_span = info_span!(
            "llm_call",
            trace_id = %self.trace_id,
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            otel.name = "llm_call"
        );

        let model = self.config.model.as_str();
        let start = Instant::now();
        let call = self.model.respond(&request).instrument(llm_span);
        let result = match self.config.model_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ChatError::Timeout(limit)),
            },
            None => call.await,
        };
        let elapsed = start.elapsed().as_secs_f64();
        MODEL_CALL_DURATION.with_label_values(&[model]).observe(elapsed);

        match result {
            Ok(turn) => {
                let outcome = if turn.has_tool_use() { "tool_use" } else { "text" };
                MODEL_CALLS.with_label_values(&[model, outcome]).inc();
                info!(
                    duration_ms = elapsed * 1000.0,
                    blocks = turn.content.len(),
                    stop_reason = ?turn.stop_reason,
                    "LLM call completed"
                );
                Ok(turn)
            }
            Err(e) => {
                let outcome = if matches!(e, ChatError::Timeout(_)) { "timeout" } else { "error" };
                MODEL_CALLS.with_label_values(&[model, outcome]).inc();
                warn!(error = %e, "LLM call failed");
                Err(e.into())
            }
        }
    }

    /// Append the response blocks in order and decide the next state.
    /// A malformed block rejects the whole turn.
    fn apply_turn(&mut self, turn: ModelTurn) -> Result<LoopState, AgentError> {
        let messages: Vec<Message> = turn
            .content
            .into_iter()
            .filter_map(Message::from_block)
            .collect();
        let pending: Vec<PendingToolUse> = messages
            .iter()
            .filter_map(|message| match message {
                Message::ToolUse { id, name, input } => Some(PendingToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect();

        let lines: Vec<String> = messages.iter().map(Message::render).collect();
        self.conversation.extend(messages)?;
        for line in &lines {
            self.console.show(line);
        }

        if pending.is_empty() {
            Ok(LoopState::AwaitingUserInput)
        } else {
            Ok(LoopState::ProcessingToolUse(pending))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tool uses
    // ─────────────────────────────────────────────────────────────────────────

    async fn process_tool_uses(
        &mut self,
        pending: Vec<PendingToolUse>,
    ) -> Result<LoopState, AgentError> {
        let mut queue: VecDeque<PendingToolUse> = pending.into();

        while let Some(tool_use) = queue.front().cloned() {
            let tool_span = info_span!(
                "tool_call",
                trace_id = %self.trace_id,
                tool = %tool_use.name,
                tool_use_id = %tool_use.id,
                otel.name = "tool_call"
            );

            let reply = match self.dispatch(&tool_use).instrument(tool_span).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.state = LoopState::ProcessingToolUse(queue.into());
                    return Err(e);
                }
            };

            let message = match reply {
                ToolReply::Ok(content) => Message::tool_result(&tool_use.id, content),
                ToolReply::Err(content) => Message::tool_error(&tool_use.id, content),
                ToolReply::Terminate => return Ok(LoopState::Terminal),
            };
            if let Err(e) = self.push(message) {
                self.state = LoopState::ProcessingToolUse(queue.into());
                return Err(e);
            }
            queue.pop_front();
        }

        self.tool_rounds += 1;
        if let Some(limit) = self.config.max_tool_rounds {
            if self.tool_rounds >= limit {
                info!(rounds = self.tool_rounds, "Tool round limit reached");
                self.console.show(&format!(
                    "[AGENT] {} tool rounds without input, returning control",
                    self.tool_rounds
                ));
                self.tool_rounds = 0;
                return Ok(LoopState::AwaitingUserInput);
            }
        }
        Ok(LoopState::AwaitingModelResponse)
    }

    /// Answer one tool use. Tool failures are replies; only infrastructure
    /// failures are errors.
    async fn dispatch(&mut self, tool_use: &PendingToolUse) -> Result<ToolReply, AgentError> {
        let target = match self.registry.lookup(&tool_use.name) {
            Ok(ToolDefinition::Hardcoded { builtin, .. }) => Ok(*builtin),
            Ok(ToolDefinition::Remote { tool, .. }) => Err(Some(tool.id.clone())),
            Err(_) => Err(None),
        };

        let (kind, reply) = match target {
            Ok(builtin) => ("builtin", self.run_builtin(builtin, tool_use.input.clone()).await?),
            Err(Some(id)) => {
                debug!(tool = %tool_use.name, id = %id, "Executing remote tool");
                let result = self
                    .executor
                    .execute(ExecTarget::Tool(&id), tool_use.input.clone())
                    .await;
                ("remote", result.into())
            }
            Err(None) => {
                warn!(tool = %tool_use.name, "Model called an unknown tool");
                ("unknown", ToolReply::Err(format!("Tool {} not found", tool_use.name)))
            }
        };

        let outcome = match &reply {
            ToolReply::Err(_) => "error",
            _ => "ok",
        };
        TOOL_CALLS.with_label_values(&[kind, outcome]).inc();
        Ok(reply)
    }

    async fn run_builtin(
        &mut self,
        builtin: BuiltinTool,
        input: Value,
    ) -> Result<ToolReply, AgentError> {
        match builtin {
            BuiltinTool::CreateTool => {
                let input: CreateToolInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                Ok(self.create_tool(input).await)
            }
            BuiltinTool::RequestUserInput => {
                match self.read_operator("[Input requested] Enter your input:").await? {
                    OperatorInput::Line(text) => {
                        self.tool_rounds = 0;
                        Ok(ToolReply::Ok(text))
                    }
                    OperatorInput::Terminate => Ok(ToolReply::Terminate),
                }
            }
            BuiltinTool::ShowOptions => {
                let input: ShowOptionsInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                self.console.show("Choose one of the following options:");
                for (i, option) in input.options.iter().enumerate() {
                    self.console.show(&format!("{}: {}", i, option));
                }
                let choice = match self.read_operator("[Input requested] Enter your input:").await? {
                    OperatorInput::Line(text) => text,
                    OperatorInput::Terminate => return Ok(ToolReply::Terminate),
                };
                self.tool_rounds = 0;
                match choice.trim().parse::<usize>() {
                    Ok(index) if index < input.options.len() => Ok(ToolReply::Ok(index.to_string())),
                    _ => Ok(ToolReply::Err(format!("Invalid selection: {}", choice.trim()))),
                }
            }
            BuiltinTool::ExecuteCode => {
                let input: ExecuteCodeInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                let target = ExecTarget::Code {
                    code: &input.code,
                    language: input.language,
                };
                Ok(self.executor.execute(target, Value::Null).await.into())
            }
            BuiltinTool::ExecuteFunction => {
                let input: ExecuteFunctionInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                let target = ExecTarget::Function {
                    code: &input.code,
                    language: input.language,
                };
                Ok(self.executor.execute(target, input.input).await.into())
            }
            BuiltinTool::FetchTool => {
                let input: FetchToolInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                Ok(self.fetch_tool(&input.tool_name).await)
            }
            BuiltinTool::EditTool => {
                let input: EditToolInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                Ok(self.edit_tool(input).await)
            }
            BuiltinTool::ListTools => {
                let tools: Vec<Value> = self
                    .registry
                    .remote_tools()
                    .map(|tool| {
                        json!({
                            "id": tool.id,
                            "name": tool.name,
                            "description": tool.description,
                            "input_schema": tool.input_schema,
                        })
                    })
                    .collect();
                Ok(ToolReply::Ok(Value::Array(tools).to_string()))
            }
            BuiltinTool::UseTool => {
                let input: UseToolInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                let id = match self.registry.lookup_remote(&input.name) {
                    Ok(tool) => tool.id.clone(),
                    Err(e) => return Ok(ToolReply::Err(e.to_string())),
                };
                Ok(self
                    .executor
                    .execute(ExecTarget::Tool(&id), input.input)
                    .await
                    .into())
            }
            BuiltinTool::SaveAgent => {
                let input: SaveAgentInput = match parse_input(builtin, input) {
                    Ok(input) => input,
                    Err(reply) => return Ok(reply),
                };
                match self.save(&input.name, "tool") {
                    Ok(()) => Ok(ToolReply::Ok(format!("Saved agent {}", input.name))),
                    Err(SessionError::InvalidName(name)) => {
                        Ok(ToolReply::Err(format!("Invalid agent name '{}'", name)))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn create_tool(&mut self, input: CreateToolInput) -> ToolReply {
        if self.registry.contains(&input.name) {
            return ToolReply::Err(RegistryError::DuplicateTool(input.name).to_string());
        }

        let request = CreateToolRequest {
            name: input.name,
            description: input.description,
            code: input.code,
            input_schema: input.input_schema,
            language: input.language,
        };
        let tool = match self.executor.sandbox().create_tool(&request).await {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = %request.name, error = %e, "Failed to create remote tool");
                return ToolReply::Err(format!("Failed to create tool: {}", e));
            }
        };

        let (name, id) = (tool.name.clone(), tool.id.clone());
        if let Err(e) = self.registry.register(ToolDefinition::remote(tool)) {
            return ToolReply::Err(e.to_string());
        }
        self.record_registry();

        info!(tool = %name, id = %id, "Created remote tool");
        self.console.show(&format!("[Created tool]: {}", name));
        let names: Vec<&str> = self.registry.remote_tools().map(|t| t.name.as_str()).collect();
        self.console
            .show(&format!("[Meta] Self-written tools: {}", names.join(", ")));
        ToolReply::Ok(format!("Created tool: {} (Tool ID: {})", name, id))
    }

    async fn fetch_tool(&self, tool_name: &str) -> ToolReply {
        let id = match self.registry.lookup_remote(tool_name) {
            Ok(tool) => tool.id.clone(),
            Err(e) => return ToolReply::Err(e.to_string()),
        };
        match self.executor.sandbox().get_tool(&id).await {
            Ok(tool) => match serde_json::to_string(&tool) {
                Ok(text) => ToolReply::Ok(text),
                Err(e) => ToolReply::Err(e.to_string()),
            },
            Err(e) => ToolReply::Err(format!("Failed to fetch tool {}: {}", tool_name, e)),
        }
    }

    async fn edit_tool(&mut self, input: EditToolInput) -> ToolReply {
        let current = match self.registry.lookup_remote(&input.tool_name) {
            Ok(tool) => tool.clone(),
            Err(e) => return ToolReply::Err(e.to_string()),
        };
        if let Some(new_name) = &input.name {
            if *new_name != current.name && self.registry.contains(new_name) {
                return ToolReply::Err(RegistryError::DuplicateTool(new_name.clone()).to_string());
            }
        }

        let request = UpdateToolRequest {
            name: input.name,
            description: input.description,
            code: input.code,
            input_schema: Some(input.input_schema.unwrap_or(current.input_schema)),
            language: input.language,
        };
        let updated = match self.executor.sandbox().update_tool(&current.id, &request).await {
            Ok(tool) => tool,
            Err(e) => return ToolReply::Err(format!("Failed to edit tool: {}", e)),
        };

        let name = updated.name.clone();
        if let Err(e) = self
            .registry
            .update(&input.tool_name, ToolDefinition::remote(updated))
        {
            return ToolReply::Err(e.to_string());
        }
        info!(tool = %input.tool_name, new_name = %name, "Edited remote tool");
        self.console.show(&format!("[Edited tool]: {}", name));
        ToolReply::Ok(format!("Updated tool: {}", name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operator I/O and persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a line from the operator, handling the save and exit commands
    async fn read_operator(&mut self, prompt: &str) -> Result<OperatorInput, AgentError> {
        let Some(line) = self.console.read_line(prompt).await? else {
            info!("Operator input closed");
            return Ok(OperatorInput::Terminate);
        };
        match line.trim() {
            SAVE_COMMAND => {
                let name = timestamp_name();
                self.save(&name, "command")?;
                self.console
                    .show(&format!("To use this agent again, run \"toolsmith {}\"", name));
                Ok(OperatorInput::Terminate)
            }
            EXIT_COMMAND => Ok(OperatorInput::Terminate),
            _ => Ok(OperatorInput::Line(line)),
        }
    }

    fn save(&mut self, name: &str, trigger: &str) -> Result<(), SessionError> {
        let path = self
            .store
            .save(&self.registry, name, self.config.initial_prompt.clone())?;
        record_save(trigger);
        self.console
            .show(&format!("[Saving agent...] {}", path.display()));
        Ok(())
    }

    /// Append to the conversation and echo it to the operator
    fn push(&mut self, message: Message) -> Result<(), AgentError> {
        let line = message.render();
        self.conversation.append(message)?;
        self.console.show(&line);
        Ok(())
    }

    fn record_registry(&self) {
        let remote = self.registry.remote_tools().count();
        set_registered_tools(self.registry.len() - remote, remote);
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(
    builtin: BuiltinTool,
    input: Value,
) -> Result<T, ToolReply> {
    serde_json::from_value(input)
        .map_err(|e| ToolReply::Err(format!("Invalid input for {}: {}", builtin, e)))
}
