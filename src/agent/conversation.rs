//! Conversation history owned by one agent loop
//!
//! Append-only and strictly chronological. `append` checks that each message
//! is well-formed on its own; pairing every tool use with its result before
//! the next model call is the loop's job.

use serde_json::Value;

use crate::llm::{ContentBlock, WireMessage, WireRole};

/// Who produced a text message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text { role: Role, text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String, is_error: bool },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::Text {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message::Text {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Convert a model content block; blocks the loop does not act on yield `None`
    pub fn from_block(block: ContentBlock) -> Option<Self> {
        match block {
            ContentBlock::Text { text } => Some(Message::assistant(text)),
            ContentBlock::ToolUse { id, name, input } => Some(Message::ToolUse { id, name, input }),
            ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::Text { role, .. } => *role,
            Message::ToolUse { .. } => Role::Assistant,
            Message::ToolResult { .. } => Role::Tool,
        }
    }

    fn wire_role(&self) -> WireRole {
        match self.role() {
            Role::Assistant => WireRole::Assistant,
            Role::User | Role::Tool => WireRole::User,
        }
    }

    fn to_block(&self) -> ContentBlock {
        match self {
            Message::Text { text, .. } => ContentBlock::Text { text: text.clone() },
            Message::ToolUse { id, name, input } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            Message::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ContentBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: *is_error,
            },
        }
    }

    /// One-line form for the operator console
    pub fn render(&self) -> String {
        match self {
            Message::Text { role: Role::User, text } => format!("User: {}", text),
            Message::Text { text, .. } => format!("Assistant: {}", text),
            Message::ToolUse { name, input, .. } => {
                format!("[Tool use] {} {}", name, input)
            }
            Message::ToolResult {
                content, is_error, ..
            } => {
                if *is_error {
                    format!("[Tool result] error: {}", content)
                } else {
                    format!("[Tool result] {}", content)
                }
            }
        }
    }
}

fn validate(message: &Message) -> Result<(), ConversationError> {
    match message {
        Message::Text {
            role: Role::Tool, ..
        } => Err(ConversationError::Malformed("text message with tool role")),
        Message::ToolUse { id, .. } if id.is_empty() => {
            Err(ConversationError::Malformed("tool use without id"))
        }
        Message::ToolUse { name, .. } if name.is_empty() => {
            Err(ConversationError::Malformed("tool use without name"))
        }
        Message::ToolResult { tool_use_id, .. } if tool_use_id.is_empty() => {
            Err(ConversationError::Malformed("tool result without tool_use_id"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Malformed message: {0}")]
    Malformed(&'static str),
}

/// Ordered, append-only message history
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) -> Result<(), ConversationError> {
        validate(&message)?;
        self.messages.push(message);
        Ok(())
    }

    /// Append several messages, or none of them if any is malformed
    pub fn extend(&mut self, messages: Vec<Message>) -> Result<(), ConversationError> {
        messages.iter().try_for_each(validate)?;
        self.messages.extend(messages);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// IDs of tool uses that have no result yet
    pub fn unanswered_tool_uses(&self) -> Vec<&str> {
        let mut pending: Vec<&str> = Vec::new();
        for message in &self.messages {
            match message {
                Message::ToolUse { id, .. } => pending.push(id),
                Message::ToolResult { tool_use_id, .. } => {
                    pending.retain(|id| *id != tool_use_id.as_str());
                }
                Message::Text { .. } => {}
            }
        }
        pending
    }

    /// Map the history onto the Messages API, merging adjacent same-role messages
    pub fn to_model_format(&self) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = Vec::new();
        for message in &self.messages {
            let role = message.wire_role();
            let block = message.to_block();
            match wire.last_mut() {
                Some(last) if last.role == role => last.content.push(block),
                _ => wire.push(WireMessage {
                    role,
                    content: vec![block],
                }),
            }
        }
        wire
    }
}
