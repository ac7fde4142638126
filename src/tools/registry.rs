//! Tool registry - the live set of tools the model may call
//!
//! The registry maps tool names to definitions and keeps registration order so
//! the manifest sent to the model is stable between calls. Built-in tools are
//! re-created from code on every start; remote-backed tools are the only part
//! that survives a session, by their durable remote ID.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::builtin::BuiltinTool;
use crate::agent::sessions::SessionSnapshot;
use crate::sandbox::{RemoteTool, SandboxError};

/// Manifest entry for a tool, in the shape the model expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

impl From<&RemoteTool> for ToolSpec {
    fn from(tool: &RemoteTool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

/// A registered tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDefinition {
    /// Built into the agent; executed by the loop's own handler
    Hardcoded { spec: ToolSpec, builtin: BuiltinTool },
    /// Stored on the sandbox service and executed there by ID
    Remote { spec: ToolSpec, tool: RemoteTool },
}

impl ToolDefinition {
    pub fn hardcoded(builtin: BuiltinTool) -> Self {
        ToolDefinition::Hardcoded {
            spec: builtin.spec(),
            builtin,
        }
    }

    pub fn remote(tool: RemoteTool) -> Self {
        ToolDefinition::Remote {
            spec: ToolSpec::from(&tool),
            tool,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec().name
    }

    pub fn spec(&self) -> &ToolSpec {
        match self {
            ToolDefinition::Hardcoded { spec, .. } | ToolDefinition::Remote { spec, .. } => spec,
        }
    }

    /// Durable remote ID, for remote-backed tools only
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            ToolDefinition::Remote { tool, .. } => Some(&tool.id),
            ToolDefinition::Hardcoded { .. } => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ToolDefinition::Remote { .. })
    }
}

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool {0} already exists")]
    DuplicateTool(String),
    #[error("Tool {0} not found")]
    ToolNotFound(String),
    #[error("Tool {0} is not a self-written tool")]
    NotRemote(String),
    #[error("failed to resolve remote tool {id}: {source}")]
    Resolve {
        id: String,
        #[source]
        source: SandboxError,
    },
}

/// Fetches a remote tool by its durable ID when a session is restored
#[async_trait]
pub trait ToolResolver: Send + Sync {
    async fn resolve(&self, id: &str) -> Result<RemoteTool, SandboxError>;
}

/// Insertion-ordered map of tool name to definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the given built-ins, in order
    pub fn with_builtins(builtins: &[BuiltinTool]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for builtin in builtins {
            registry.register(ToolDefinition::hardcoded(*builtin))?;
        }
        Ok(registry)
    }

    /// Add a tool. Fails without touching the registry if the name is taken.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Replace a remote-backed tool in place, keeping its listing position.
    ///
    /// The replacement may carry a new name; renaming onto another tool's
    /// name fails and leaves the registry unchanged.
    pub fn update(&mut self, current: &str, tool: ToolDefinition) -> Result<(), RegistryError> {
        let position = *self
            .index
            .get(current)
            .ok_or_else(|| RegistryError::ToolNotFound(current.to_string()))?;

        if !self.tools[position].is_remote() || !tool.is_remote() {
            return Err(RegistryError::NotRemote(current.to_string()));
        }

        let new_name = tool.name().to_string();
        if new_name != current && self.index.contains_key(&new_name) {
            return Err(RegistryError::DuplicateTool(new_name));
        }

        self.index.remove(current);
        self.index.insert(new_name, position);
        self.tools[position] = tool;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, RegistryError> {
        self.index
            .get(name)
            .map(|&position| &self.tools[position])
            .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
    }

    /// Look up a tool that must be remote-backed
    pub fn lookup_remote(&self, name: &str) -> Result<&RemoteTool, RegistryError> {
        match self.lookup(name)? {
            ToolDefinition::Remote { tool, .. } => Ok(tool),
            ToolDefinition::Hardcoded { .. } => Err(RegistryError::NotRemote(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDefinition::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    /// Self-written tools, in registration order
    pub fn remote_tools(&self) -> impl Iterator<Item = &RemoteTool> {
        self.tools.iter().filter_map(|tool| match tool {
            ToolDefinition::Remote { tool, .. } => Some(tool),
            ToolDefinition::Hardcoded { .. } => None,
        })
    }

    /// Capability manifest for the next model call
    pub fn list_for_model(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec().clone()).collect()
    }

    /// Persisted form of the registry: remote IDs only
    pub fn snapshot(&self, name: impl Into<String>, prompt: Option<String>) -> SessionSnapshot {
        SessionSnapshot {
            name: name.into(),
            remote_tool_ids: self.remote_tools().map(|tool| tool.id.clone()).collect(),
            prompt,
        }
    }

    /// Rehydrate every remote tool in `snapshot` and register it.
    ///
    /// Either all tools are registered or none are. Returns the number of
    /// tools restored.
    pub async fn restore<R>(
        &mut self,
        snapshot: &SessionSnapshot,
        resolver: &R,
    ) -> Result<usize, RegistryError>
    where
        R: ToolResolver + ?Sized,
    {
        let mut staged = self.clone();
        for id in &snapshot.remote_tool_ids {
            let tool = resolver
                .resolve(id)
                .await
                .map_err(|source| RegistryError::Resolve {
                    id: id.clone(),
                    source,
                })?;
            staged.register(ToolDefinition::remote(tool))?;
        }

        *self = staged;
        Ok(snapshot.remote_tool_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ToolLanguage;

    fn remote(name: &str, id: &str) -> RemoteTool {
        RemoteTool {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} tool", name),
            code: "function execute(input) { return input; }".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
            language: ToolLanguage::Typescript,
            revision_id: None,
        }
    }

    struct MapResolver(HashMap<String, RemoteTool>);

    #[async_trait]
    impl ToolResolver for MapResolver {
        async fn resolve(&self, id: &str) -> Result<RemoteTool, SandboxError> {
            self.0
                .get(id)
                .cloned()
                .ok_or_else(|| SandboxError::Status {
                    status: 404,
                    body: format!("tool {} not found", id),
                })
        }
    }

    #[test]
    fn test_listing_preserves_insertion_order() {
        let mut registry = ToolRegistry::new();
        for (name, id) in [("zeta", "t_1"), ("alpha", "t_2"), ("mid", "t_3")] {
            registry.register(ToolDefinition::remote(remote(name, id))).unwrap();
        }

        let names: Vec<_> = registry.list_for_model().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_register_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::with_builtins(&[BuiltinTool::RequestUserInput]).unwrap();
        registry.register(ToolDefinition::remote(remote("get_weather", "t_123"))).unwrap();
        let before = registry.clone();

        let err = registry
            .register(ToolDefinition::remote(remote("get_weather", "t_999")))
            .unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateTool(ref n) if n == "get_weather"));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_remote_tool_lookup_and_snapshot() {
        let mut tool = remote("get_weather", "t_123");
        tool.input_schema = serde_json::json!({
            "type": "object",
            "properties": {"city": {"type": "string"}}
        });
        let mut registry = ToolRegistry::with_builtins(&[BuiltinTool::CreateTool]).unwrap();
        registry.register(ToolDefinition::remote(tool)).unwrap();

        let found = registry.lookup("get_weather").unwrap();
        assert_eq!(found.remote_id(), Some("t_123"));

        let snapshot = registry.snapshot("weather", None);
        assert_eq!(snapshot.remote_tool_ids, vec!["t_123"]);
    }

    #[test]
    fn test_lookup_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "Tool nonexistent not found");
    }

    #[test]
    fn test_update_renames_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition::remote(remote("a", "t_a"))).unwrap();
        registry.register(ToolDefinition::remote(remote("b", "t_b"))).unwrap();

        registry
            .update("a", ToolDefinition::remote(remote("a2", "t_a")))
            .unwrap();

        assert_eq!(registry.names(), vec!["a2", "b"]);
        assert!(!registry.contains("a"));
        assert_eq!(registry.lookup("a2").unwrap().remote_id(), Some("t_a"));
    }

    #[test]
    fn test_update_rejects_collisions_and_builtins() {
        let mut registry = ToolRegistry::with_builtins(&[BuiltinTool::SaveAgent]).unwrap();
        registry.register(ToolDefinition::remote(remote("a", "t_a"))).unwrap();
        registry.register(ToolDefinition::remote(remote("b", "t_b"))).unwrap();
        let before = registry.clone();

        assert!(matches!(
            registry.update("a", ToolDefinition::remote(remote("b", "t_a"))),
            Err(RegistryError::DuplicateTool(_))
        ));
        assert!(matches!(
            registry.update("save_agent", ToolDefinition::remote(remote("x", "t_x"))),
            Err(RegistryError::NotRemote(_))
        ));
        assert_eq!(registry, before);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let mut original = ToolRegistry::new();
        let mut store = HashMap::new();
        for (name, id) in [("one", "t_1"), ("two", "t_2")] {
            let tool = remote(name, id);
            store.insert(id.to_string(), tool.clone());
            original.register(ToolDefinition::remote(tool)).unwrap();
        }

        let snapshot = original.snapshot("pair", None);
        let mut restored = ToolRegistry::new();
        let count = restored.restore(&snapshot, &MapResolver(store)).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(restored.names(), original.names());
        let ids: Vec<_> = restored.remote_tools().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t_1", "t_2"]);
    }

    #[tokio::test]
    async fn test_restore_is_atomic() {
        let mut store = HashMap::new();
        store.insert("t_1".to_string(), remote("one", "t_1"));

        let snapshot = SessionSnapshot {
            name: "broken".to_string(),
            remote_tool_ids: vec!["t_1".to_string(), "t_missing".to_string()],
            prompt: None,
        };

        let mut registry = ToolRegistry::with_builtins(&[BuiltinTool::RequestUserInput]).unwrap();
        let before = registry.clone();
        let err = registry.restore(&snapshot, &MapResolver(store)).await.unwrap_err();

        assert!(matches!(err, RegistryError::Resolve { ref id, .. } if id == "t_missing"));
        assert_eq!(registry, before);
    }
}
