//! Saved agents
//!
//! A saved agent is the minimal state needed to resume: the durable IDs of
//! its self-written tools and an optional prompt. Built-in tools are
//! re-registered from code and tool source is re-fetched from the sandbox,
//! so neither is written to disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::metrics::SESSIONS_SAVED;
use crate::tools::ToolRegistry;

/// Persisted form of a tool registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Empty in legacy files; filled from the file stem on load
    #[serde(default)]
    pub name: String,
    /// Remote IDs in registration order
    #[serde(rename = "rizaTools", alias = "tools")]
    pub remote_tool_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Saved agent '{0}' not found")]
    NotFound(String),
    #[error("Saved agent '{name}' is malformed: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid agent name '{0}'")]
    InvalidName(String),
    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary of a saved agent for listing
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub tool_count: usize,
    pub prompt: Option<String>,
    pub modified: DateTime<Local>,
}

/// Directory of saved agents, one JSON file each
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
}

impl SessionStore {
    /// Open (and create if needed) a store rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create with default directory (~/.toolsmith/saved-agents)
    pub fn default_store() -> std::io::Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".toolsmith").join("saved-agents"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Snapshot `registry` under `name` and write it
    pub fn save(
        &self,
        registry: &ToolRegistry,
        name: &str,
        prompt: Option<String>,
    ) -> Result<PathBuf, SessionError> {
        self.save_snapshot(&registry.snapshot(name, prompt))
    }

    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, SessionError> {
        let path = self.session_path(&snapshot.name)?;
        let json = serde_json::to_string_pretty(snapshot).map_err(|source| {
            SessionError::Malformed {
                name: snapshot.name.clone(),
                source,
            }
        })?;
        std::fs::write(&path, json)?;
        tracing::info!(
            name = %snapshot.name,
            tools = snapshot.remote_tool_ids.len(),
            path = %path.display(),
            "Saved agent"
        );
        Ok(path)
    }

    /// Load a saved agent by name
    pub fn load(&self, name: &str) -> Result<SessionSnapshot, SessionError> {
        let path = self.session_path(name)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        parse_snapshot(name, &json)
    }

    /// List saved agents, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let snapshot = match std::fs::read_to_string(&path)
                .map_err(SessionError::from)
                .and_then(|json| parse_snapshot(stem, &json))
            {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable saved agent");
                    continue;
                }
            };
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            sessions.push(SessionSummary {
                name: stem.to_string(),
                tool_count: snapshot.remote_tool_ids.len(),
                prompt: snapshot.prompt.as_deref().map(|p| truncate(p, 50)),
                modified: DateTime::<Local>::from(modified),
            });
        }
        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(sessions)
    }

    /// Delete a saved agent
    pub fn delete(&self, name: &str) -> Result<(), SessionError> {
        let path = self.session_path(name)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SessionError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn session_path(&self, name: &str) -> Result<PathBuf, SessionError> {
        validate_name(name)?;
        Ok(self.base_dir.join(format!("{}.json", name)))
    }
}

/// Record a save in the metrics
pub fn record_save(trigger: &str) {
    SESSIONS_SAVED.with_label_values(&[trigger]).inc();
}

/// Filename-safe local timestamp, used by the `save` command
pub fn timestamp_name() -> String {
    Local::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

fn validate_name(name: &str) -> Result<(), SessionError> {
    let invalid = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0');
    if invalid {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn parse_snapshot(name: &str, json: &str) -> Result<SessionSnapshot, SessionError> {
    let mut snapshot: SessionSnapshot =
        serde_json::from_str(json).map_err(|source| SessionError::Malformed {
            name: name.to_string(),
            source,
        })?;
    if snapshot.name.is_empty() {
        snapshot.name = name.to_string();
    }
    Ok(snapshot)
}

/// Truncate a string to max characters, adding ellipsis if needed
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
