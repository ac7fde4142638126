//! Tool registry and built-in tools
//!
//! - `registry` - name → definition map with stable ordering and snapshots
//! - `builtin` - hardcoded tools and their input shapes

pub mod builtin;
pub mod registry;

pub use builtin::{BuiltinTool, DEFAULT_SYSTEM_PROMPT};
pub use registry::{RegistryError, ToolDefinition, ToolRegistry, ToolResolver, ToolSpec};
