use std::sync::Arc;

use anyhow::Context;
use toolsmith::agent::{AgentLoop, SessionStore, StdConsole};
use toolsmith::config::Settings;
use toolsmith::{metrics, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();

    telemetry::init_tracing("toolsmith", settings.otlp_endpoint.as_deref(), settings.log_json)?;

    let store = settings.session_store()?;
    if settings.list {
        list_sessions(&store)?;
        return Ok(());
    }

    let result = run(&settings, store).await;

    if settings.print_metrics {
        println!("{}", metrics::gather_text());
    }
    telemetry::shutdown_tracing();
    result
}

async fn run(settings: &Settings, store: SessionStore) -> anyhow::Result<()> {
    let model = Arc::new(settings.chat_client()?);
    let executor = settings.executor()?;
    let config = settings.agent_config();
    let console = Box::new(StdConsole::new());

    println!("[AGENT] Model: {}", config.model);
    println!(
        "[AGENT] Sandbox hosts: {}",
        match executor.policy().hosts() {
            hosts if hosts.is_empty() => "none".to_string(),
            hosts => hosts.join(", "),
        }
    );

    let mut agent = match &settings.session {
        Some(name) => {
            let snapshot = store
                .load(name)
                .with_context(|| format!("cannot resume '{}'", name))?;
            println!(
                "[AGENT] Loading {} ({} saved tools{})",
                snapshot.name,
                snapshot.remote_tool_ids.len(),
                if config.allow_tool_creation { "" } else { ", tool creation disabled" }
            );
            AgentLoop::resume(model, executor, store, console, config, &snapshot).await?
        }
        None => AgentLoop::new(model, executor, store, console, config)?,
    };

    println!("[AGENT] Type \"save\" to save this agent and exit, \"exit\" to quit.");
    agent.run().await?;
    Ok(())
}

fn list_sessions(store: &SessionStore) -> anyhow::Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No saved agents in {}", store.base_dir().display());
        return Ok(());
    }
    println!("┌──────────────────────────────┬───────┬─────────────────────┐");
    println!("│ {:<28} │ {:>5} │ {:<19} │", "Name", "Tools", "Modified");
    println!("├──────────────────────────────┼───────┼─────────────────────┤");
    for session in sessions {
        println!(
            "│ {:<28} │ {:>5} │ {:<19} │",
            session.name,
            session.tool_count,
            session.modified.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("└──────────────────────────────┴───────┴─────────────────────┘");
    Ok(())
}
