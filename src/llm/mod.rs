//! LLM adapter
//!
//! Wire types for the Messages API, the streaming accumulator, and the
//! [`LanguageModel`] seam the agent loop calls through.

pub mod client;
pub mod messages;
pub mod stream;

pub use client::{ChatClient, ChatError, LanguageModel};
pub use messages::{ContentBlock, ModelRequest, ModelTurn, StopReason, Usage, WireMessage, WireRole};
pub use stream::{StreamAccumulator, StreamEvent};
