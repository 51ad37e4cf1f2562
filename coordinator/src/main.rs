//! CacheWarden host binary.
//!
//! Speaks Chrome's native messaging framing on stdin/stdout: host
//! events in, coordinator commands out. State is persisted to a JSON
//! document next to the store path the extension configures.

use anyhow::Context;
use async_trait::async_trait;
use cachewarden::{protocol, EventBridge, HostBridge, HostCommand, StateCoordinator};
use clap::Parser;
use common::{HttpHeader, RequestId, TabId};
use std::path::PathBuf;
use std::sync::Arc;
use storage::JsonFileStore;
use tokio::io::Stdout;
use tokio::sync::Mutex;

/// Source hosts supported by the bundled resolver tables.
const DEFAULT_HOSTS: &[&str] = &[
    "ajax.googleapis.com",
    "ajax.aspnetcdn.com",
    "ajax.microsoft.com",
    "cdnjs.cloudflare.com",
    "code.jquery.com",
    "cdn.jsdelivr.net",
    "yastatic.net",
    "apps.bdimg.com",
    "libs.baidu.com",
    "lib.sinaapp.com",
];

/// Command line arguments for the coordinator host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the JSON state store
    #[arg(short, long, default_value = "cachewarden-state.json")]
    store: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Supported source hosts, comma separated (defaults to the
    /// bundled resolver tables)
    #[arg(long, value_delimiter = ',')]
    hosts: Vec<String>,
}

/// Host bridge that emits commands as stdout frames.
struct StdioBridge {
    stdout: Mutex<Stdout>,
}

impl StdioBridge {
    fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }

    async fn send(&self, command: HostCommand) -> anyhow::Result<()> {
        let mut stdout = self.stdout.lock().await;
        protocol::write_command(&mut *stdout, &command)
            .await
            .context("Failed to write host command")
    }
}

#[async_trait]
impl HostBridge for StdioBridge {
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> anyhow::Result<()> {
        self.send(HostCommand::SetBadgeText {
            tab_id,
            text: text.to_string(),
        })
        .await
    }

    async fn add_request_listener(
        &self,
        tab_id: TabId,
        url_patterns: &[String],
    ) -> anyhow::Result<()> {
        self.send(HostCommand::AddRequestListener {
            tab_id,
            urls: url_patterns.to_vec(),
        })
        .await
    }

    async fn add_header_listener(&self, url_patterns: &[String]) -> anyhow::Result<()> {
        self.send(HostCommand::AddHeaderListener {
            urls: url_patterns.to_vec(),
        })
        .await
    }

    async fn remove_header_listener(&self) -> anyhow::Result<()> {
        self.send(HostCommand::RemoveHeaderListener).await
    }

    async fn replace_request_headers(
        &self,
        request_id: &RequestId,
        headers: Vec<HttpHeader>,
    ) -> anyhow::Result<()> {
        self.send(HostCommand::ReplaceRequestHeaders {
            request_id: request_id.clone(),
            headers,
        })
        .await
    }
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries protocol frames, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("CacheWarden coordinator host starting");

    let hosts = if args.hosts.is_empty() {
        DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
    } else {
        args.hosts
    };

    let store = JsonFileStore::open(&args.store)
        .await
        .with_context(|| format!("Failed to open state store at {}", args.store.display()))?;

    let coordinator = Arc::new(StateCoordinator::new(
        Arc::new(StdioBridge::new()),
        Arc::new(store),
        hosts,
    ));
    let bridge = EventBridge::new(coordinator);

    let mut stdin = tokio::io::stdin();
    loop {
        match protocol::read_event(&mut stdin).await {
            Ok(event) => {
                tracing::debug!(?event, "Processing host event");
                bridge.handle_event(event).await;
            }
            Err(e) if e.is_closed_channel() => {
                tracing::info!("Host closed the event channel, shutting down");
                break;
            }
            Err(e) => {
                // Continue processing - one bad frame must not take
                // down the dispatch loop.
                tracing::error!(error = %e, "Failed to read host event");
            }
        }
    }

    Ok(())
}
