//! Built-in tools
//!
//! The agent ships with only a handful of tools; everything else it writes
//! for itself through `create_tool`. Each variant knows its own manifest
//! entry and the input shape the model must send.

use serde::Deserialize;
use serde_json::{json, Value};

use super::registry::ToolSpec;
use crate::sandbox::{Language, ToolLanguage};

/// Default system prompt for the self-learning agent
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an autonomous agent that can create tools to perform tasks. You can write Typescript code to create tools. You can also use the tools you have created to perform tasks. Do not execute tools unless a user asks you to perform a task that requires one. Do not execute tools for example purposes.

You should use the `create_tool` tool to create new tools. All tools must have a unique name, including from the available tools.

Each tool should be written in Typescript code, as a function named `execute` that takes one argument called `input`. For example:

```typescript
function execute(input: unknown) {
  // ...
}
```

You must also write the `input_schema` for the tool, which must be a valid JSON Schema object.

The `input` argument passed to the `execute` function will match the schema of the `input_schema` of the tool.

If you write a tool that uses an external API, you must make plain HTTP requests to the API, using only the fetch library. You can assume that any authentication is handled outside of the tool via an http proxy, so you do not need to add authentication headers or parameters to the request.

Your tools may require making multiple HTTP requests to different APIs, for example if you need to query an API to get an ID first.

When possible, your tools should return JSON objects rather than formatted strings.

When executing tools, you should use the `request_user_input` tool to request user input if you need to."#;

/// Hardcoded tools the loop knows how to execute itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    CreateTool,
    RequestUserInput,
    ShowOptions,
    ExecuteCode,
    ExecuteFunction,
    FetchTool,
    EditTool,
    ListTools,
    UseTool,
    SaveAgent,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 10] = [
        BuiltinTool::CreateTool,
        BuiltinTool::RequestUserInput,
        BuiltinTool::ShowOptions,
        BuiltinTool::ExecuteCode,
        BuiltinTool::ExecuteFunction,
        BuiltinTool::FetchTool,
        BuiltinTool::EditTool,
        BuiltinTool::ListTools,
        BuiltinTool::UseTool,
        BuiltinTool::SaveAgent,
    ];

    /// Tools registered by a fresh CLI agent
    pub const DEFAULT_SET: [BuiltinTool; 7] = [
        BuiltinTool::CreateTool,
        BuiltinTool::RequestUserInput,
        BuiltinTool::ShowOptions,
        BuiltinTool::ExecuteCode,
        BuiltinTool::FetchTool,
        BuiltinTool::EditTool,
        BuiltinTool::SaveAgent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::CreateTool => "create_tool",
            BuiltinTool::RequestUserInput => "request_user_input",
            BuiltinTool::ShowOptions => "show_options",
            BuiltinTool::ExecuteCode => "execute_code",
            BuiltinTool::ExecuteFunction => "execute_function",
            BuiltinTool::FetchTool => "fetch_tool",
            BuiltinTool::EditTool => "edit_tool",
            BuiltinTool::ListTools => "list_tools",
            BuiltinTool::UseTool => "use_tool",
            BuiltinTool::SaveAgent => "save_agent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// Whether the tool grows or rewrites the tool set
    pub fn is_learning(self) -> bool {
        matches!(self, BuiltinTool::CreateTool)
    }

    pub fn spec(self) -> ToolSpec {
        let (description, input_schema) = match self {
            BuiltinTool::CreateTool => (
                "Create a new tool. This tool will be used to create new tools. You can use the tools you have created to perform tasks.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the tool you are writing. This is what you will use to call the tool."
                        },
                        "description": {
                            "type": "string",
                            "description": "A description of the tool you are writing. This will help you or other agents or people pick the appropriate tool in the future."
                        },
                        "code": {
                            "type": "string",
                            "description": "The Typescript code for the tool you are writing. The code should be a valid Typescript function named `execute` that takes one argument called `input`. When called, the `input` provided will match the schema of the `input_schema` of the tool."
                        },
                        "input_schema": {
                            "type": "object",
                            "description": "The input schema for the tool. This must be provided as a valid JSON Schema object."
                        },
                        "language": {
                            "type": "string",
                            "enum": ["TYPESCRIPT", "PYTHON"],
                            "description": "The language of the tool you are writing. Defaults to TYPESCRIPT."
                        }
                    },
                    "required": ["name", "description", "code", "input_schema"]
                }),
            ),
            BuiltinTool::RequestUserInput => (
                "Request user input. The tool will respond with the user input.",
                json!({"type": "object", "properties": {}}),
            ),
            BuiltinTool::ShowOptions => (
                "Show the user a list of options to choose from as a numbered list starting from 0, corresponding to the index of the option in the list. Returns the user's choice, which will be the index of the option they choose.",
                json!({
                    "type": "object",
                    "required": ["options"],
                    "properties": {
                        "options": {"type": "array", "items": {"type": "string"}}
                    }
                }),
            ),
            BuiltinTool::ExecuteCode => (
                "Execute arbitrary Typescript or Python code as a script and return its stdout.",
                json!({
                    "type": "object",
                    "required": ["code"],
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "The code you are writing. This will be executed as a script. If you write code as a function, you must make sure you call it inside the script and print the output to stdout. If your function is async, you must await it when you call it."
                        },
                        "language": {
                            "type": "string",
                            "enum": ["typescript", "python"],
                            "description": "The language of the code. Defaults to typescript."
                        }
                    }
                }),
            ),
            BuiltinTool::ExecuteFunction => (
                "Execute a TypeScript function with the given input. The function name must be 'execute'.",
                json!({
                    "type": "object",
                    "required": ["code"],
                    "properties": {
                        "code": {"type": "string"},
                        "input": {"type": "object"}
                    }
                }),
            ),
            BuiltinTool::FetchTool => (
                "Fetch a self-written tool, including its source code.",
                json!({
                    "type": "object",
                    "required": ["tool_name"],
                    "properties": {"tool_name": {"type": "string"}}
                }),
            ),
            BuiltinTool::EditTool => (
                "Edit a self-written tool, including its source code. Omit properties that you do not want to change.",
                json!({
                    "type": "object",
                    "required": ["tool_name"],
                    "properties": {
                        "tool_name": {
                            "type": "string",
                            "description": "The name of the tool you are editing."
                        },
                        "name": {
                            "type": "string",
                            "description": "A new name for the tool."
                        },
                        "description": {"type": "string"},
                        "code": {"type": "string"},
                        "input_schema": {"type": "object"},
                        "language": {"type": "string", "enum": ["TYPESCRIPT", "PYTHON"]}
                    }
                }),
            ),
            BuiltinTool::ListTools => (
                "Lists the tool definitions of all self-written tools available for use. These tools can be used by calling `use_tool` with the name and input.",
                json!({"type": "object", "properties": {}}),
            ),
            BuiltinTool::UseTool => (
                "Use a self-written tool by name with the given input.",
                json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string", "description": "The name of the tool to use."},
                        "input": {"type": "object", "description": "The input to pass to the tool."}
                    }
                }),
            ),
            BuiltinTool::SaveAgent => (
                "Save the current set of tools as an agent.",
                json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the agent you are saving. This will be used to identify the agent in the future."
                        }
                    }
                }),
            ),
        };
        ToolSpec::new(self.name(), description, input_schema)
    }
}

impl std::fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateToolInput {
    pub name: String,
    pub description: String,
    pub code: String,
    pub input_schema: Value,
    #[serde(default)]
    pub language: ToolLanguage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowOptionsInput {
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCodeInput {
    pub code: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteFunctionInput {
    pub code: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchToolInput {
    pub tool_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditToolInput {
    pub tool_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub input_schema: Option<Value>,
    pub language: Option<ToolLanguage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UseToolInput {
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveAgentInput {
    pub name: String,
}
