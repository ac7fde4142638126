//! Outbound HTTP policy for sandboxed code
//!
//! Code running in the sandbox never sees credentials. Instead every call
//! carries an allow-list of hosts, each with an optional auth rule that the
//! sandbox's egress proxy injects into matching requests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential injected for requests to an allowed host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostAuth {
    Bearer { token: String },
    Basic { user_id: String, password: String },
    Header { name: String, value: String },
    Query { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowRule {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<HostAuth>,
}

impl AllowRule {
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth: None,
        }
    }

    pub fn bearer(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth: Some(HostAuth::Bearer {
                token: token.into(),
            }),
        }
    }

    pub fn query(host: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth: Some(HostAuth::Query {
                key: key.into(),
                value: value.into(),
            }),
        }
    }
}

/// Allow-list forwarded unchanged with every sandbox call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpPolicy {
    #[serde(default)]
    pub allow: Vec<AllowRule>,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Well-known credential variables and the host each one unlocks
const BEARER_CREDENTIALS: [(&str, &str); 4] = [
    ("STRIPE_TESTMODE_API_KEY", "api.stripe.com"),
    ("SLACK_API_KEY", "slack.com"),
    ("OPENAI_API_KEY", "api.openai.com"),
    ("AIRTABLE_API_KEY", "api.airtable.com"),
];

const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
const GOOGLE_HOSTS: &str = "*.googleapis.com";

impl HttpPolicy {
    /// Policy that lets sandboxed code reach any host, unauthenticated
    pub fn allow_all() -> Self {
        Self {
            allow: vec![AllowRule::host("*")],
        }
    }

    /// Build the allow-list from credential environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the allow-list from any key → value source; unset or empty
    /// values are skipped
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut allow: Vec<AllowRule> = BEARER_CREDENTIALS
            .iter()
            .filter_map(|(key, host)| present(key).map(|token| AllowRule::bearer(*host, token)))
            .collect();

        if let Some(key) = present(GOOGLE_API_KEY) {
            allow.push(AllowRule::query(GOOGLE_HOSTS, "key", key));
        }

        Self { allow }
    }

    /// Load a policy from a JSON file of the form `{"allow": [...]}`
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| PolicyError::Parse {
            path: display,
            source,
        })
    }

    /// Merge another policy in; its rules replace ours for the same host
    pub fn merge(mut self, other: HttpPolicy) -> Self {
        for rule in other.allow {
            self.allow.retain(|existing| existing.host != rule.host);
            self.allow.push(rule);
        }
        self
    }

    pub fn hosts(&self) -> Vec<&str> {
        self.allow.iter().map(|rule| rule.host.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_skips_unset_credentials() {
        let env: HashMap<&str, &str> = [
            ("SLACK_API_KEY", "xoxb-1"),
            ("GOOGLE_API_KEY", "g-key"),
            ("OPENAI_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        let policy = HttpPolicy::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(policy.hosts(), vec!["slack.com", "*.googleapis.com"]);
        assert_eq!(policy.allow[0], AllowRule::bearer("slack.com", "xoxb-1"));
        assert_eq!(policy.allow[1], AllowRule::query("*.googleapis.com", "key", "g-key"));
    }

    #[test]
    fn test_wire_format() {
        let policy = HttpPolicy {
            allow: vec![
                AllowRule::bearer("api.stripe.com", "sk_test"),
                AllowRule::host("example.com"),
            ],
        };

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "allow": [
                    {"host": "api.stripe.com", "auth": {"bearer": {"token": "sk_test"}}},
                    {"host": "example.com"}
                ]
            })
        );
    }

    #[test]
    fn test_merge_replaces_same_host() {
        let base = HttpPolicy {
            allow: vec![AllowRule::bearer("slack.com", "old"), AllowRule::host("a.com")],
        };
        let merged = base.merge(HttpPolicy {
            allow: vec![AllowRule::bearer("slack.com", "new")],
        });

        assert_eq!(merged.hosts(), vec!["a.com", "slack.com"]);
        assert_eq!(merged.allow[1], AllowRule::bearer("slack.com", "new"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(
            &path,
            r#"{"allow": [{"host": "api.github.com", "auth": {"header": {"name": "X-Token", "value": "t"}}}]}"#,
        )
        .unwrap();

        let policy = HttpPolicy::load_file(&path).unwrap();
        assert_eq!(
            policy.allow[0].auth,
            Some(HostAuth::Header {
                name: "X-Token".to_string(),
                value: "t".to_string()
            })
        );

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(HttpPolicy::load_file(&path), Err(PolicyError::Parse { .. })));
    }
}
