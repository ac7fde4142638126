//! Streaming response accumulation
//!
//! A streamed response arrives as server-sent events. Text and tool input
//! arrive as deltas (`text_delta`, `input_json_delta`) keyed by block index;
//! a block is only actionable once its `content_block_stop` has been seen
//! and, for tool uses, its accumulated JSON parses.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::client::ChatError;
use super::messages::{ContentBlock, ModelTurn, StopReason, Usage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStart {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaUsage {
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// One server-sent event of a streamed response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
    #[serde(other)]
    Unknown,
}

/// A block that has started but not yet stopped
#[derive(Debug)]
enum PartialBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        initial_input: Value,
        input_json: String,
    },
    Ignored,
}

impl PartialBlock {
    fn finish(self, index: usize) -> Result<Option<ContentBlock>, ChatError> {
        match self {
            PartialBlock::Text(text) => Ok(Some(ContentBlock::Text { text })),
            PartialBlock::ToolUse {
                id,
                name,
                initial_input,
                input_json,
            } => {
                let input = if input_json.trim().is_empty() {
                    initial_input
                } else {
                    serde_json::from_str(&input_json).map_err(|e| {
                        ChatError::Stream(format!(
                            "invalid tool input JSON in block {}: {}",
                            index, e
                        ))
                    })?
                };
                Ok(Some(ContentBlock::ToolUse { id, name, input }))
            }
            PartialBlock::Ignored => Ok(None),
        }
    }
}

/// Folds stream events into a complete [`ModelTurn`]
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    open: BTreeMap<usize, PartialBlock>,
    complete: BTreeMap<usize, ContentBlock>,
    stop_reason: Option<StopReason>,
    usage: Usage,
    model: String,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the text delta it carried, if any.
    pub fn push(&mut self, event: StreamEvent) -> Result<Option<String>, ChatError> {
        match event {
            StreamEvent::MessageStart { message } => {
                self.model = message.model;
                self.usage.input_tokens = message.usage.input_tokens;
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let partial = match content_block {
                    ContentBlock::Text { text } => PartialBlock::Text(text),
                    ContentBlock::ToolUse { id, name, input } => PartialBlock::ToolUse {
                        id,
                        name,
                        initial_input: input,
                        input_json: String::new(),
                    },
                    ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => {
                        PartialBlock::Ignored
                    }
                };
                self.open.insert(index, partial);
            }
            StreamEvent::ContentBlockDelta { index, delta } => {
                let block = self.open.get_mut(&index).ok_or_else(|| {
                    ChatError::Stream(format!("delta for unopened block {}", index))
                })?;
                match (block, delta) {
                    (PartialBlock::Text(text), BlockDelta::TextDelta { text: chunk }) => {
                        text.push_str(&chunk);
                        return Ok(Some(chunk));
                    }
                    (
                        PartialBlock::ToolUse { input_json, .. },
                        BlockDelta::InputJsonDelta { partial_json },
                    ) => input_json.push_str(&partial_json),
                    _ => {}
                }
            }
            StreamEvent::ContentBlockStop { index } => {
                let partial = self.open.remove(&index).ok_or_else(|| {
                    ChatError::Stream(format!("stop for unopened block {}", index))
                })?;
                if let Some(block) = partial.finish(index)? {
                    self.complete.insert(index, block);
                }
            }
            StreamEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                }
            }
            StreamEvent::MessageStop => self.done = true,
            StreamEvent::Error { error } => {
                return Err(ChatError::Api {
                    kind: error.kind,
                    message: error.message,
                });
            }
            StreamEvent::Ping | StreamEvent::Unknown => {}
        }
        Ok(None)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Blocks in index order. Fails if any block never completed or the
    /// stream ended before `message_stop`.
    pub fn finish(self) -> Result<ModelTurn, ChatError> {
        if let Some(index) = self.open.keys().next() {
            return Err(ChatError::Stream(format!(
                "stream ended before block {} completed",
                index
            )));
        }
        if !self.done {
            return Err(ChatError::Stream(
                "stream ended before message_stop".to_string(),
            ));
        }
        Ok(ModelTurn {
            content: self.complete.into_values().collect(),
            stop_reason: self.stop_reason,
            usage: self.usage,
        })
    }
}
