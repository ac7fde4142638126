//! Prometheus metrics for the agent loop
//!
//! Registered once in the default registry and rendered with [`gather_text`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // Model Calls
    // ─────────────────────────────────────────────────────────────────────────────

    /// Wall-clock duration of each model call, including stream accumulation.
    ///
    /// Labels:
    /// - model: Model name sent in the request
    pub static ref MODEL_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "toolsmith_model_call_duration_seconds",
        "Duration of LLM calls",
        &["model"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).expect("failed to register MODEL_CALL_DURATION metric");

    /// Model calls by outcome ("text", "tool_use", "error", "timeout").
    pub static ref MODEL_CALLS: CounterVec = register_counter_vec!(
        "toolsmith_model_calls_total",
        "LLM calls by outcome",
        &["model", "outcome"]
    ).expect("failed to register MODEL_CALLS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Tools
    // ─────────────────────────────────────────────────────────────────────────────

    /// Tool uses processed by the loop.
    ///
    /// Labels:
    /// - kind: "builtin", "remote" or "unknown"
    /// - outcome: "ok" or "error"
    pub static ref TOOL_CALLS: CounterVec = register_counter_vec!(
        "toolsmith_tool_calls_total",
        "Tool uses processed by the agent loop",
        &["kind", "outcome"]
    ).expect("failed to register TOOL_CALLS metric");

    /// Calls into the sandbox service, by target ("tool", "code", "function")
    /// and status ("success", "failure", "transport_error").
    pub static ref REMOTE_EXECUTIONS: CounterVec = register_counter_vec!(
        "toolsmith_remote_executions_total",
        "Sandbox executions by target and status",
        &["target", "status"]
    ).expect("failed to register REMOTE_EXECUTIONS metric");

    pub static ref REMOTE_EXECUTION_DURATION: HistogramVec = register_histogram_vec!(
        "toolsmith_remote_execution_duration_seconds",
        "Duration of sandbox executions",
        &["target"]
    ).expect("failed to register REMOTE_EXECUTION_DURATION metric");

    /// Tools currently registered, by kind ("builtin", "remote").
    pub static ref REGISTERED_TOOLS: GaugeVec = register_gauge_vec!(
        "toolsmith_registered_tools",
        "Tools currently in the registry",
        &["kind"]
    ).expect("failed to register REGISTERED_TOOLS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────────

    /// Snapshots written, by trigger ("command", "tool").
    pub static ref SESSIONS_SAVED: CounterVec = register_counter_vec!(
        "toolsmith_sessions_saved_total",
        "Session snapshots written",
        &["trigger"]
    ).expect("failed to register SESSIONS_SAVED metric");
}

/// Record the registry's current composition
pub fn set_registered_tools(builtin: usize, remote: usize) {
    REGISTERED_TOOLS.with_label_values(&["builtin"]).set(builtin as f64);
    REGISTERED_TOOLS.with_label_values(&["remote"]).set(remote as f64);
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
