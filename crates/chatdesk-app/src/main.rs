//! Chatdesk application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Open the key-value store (SQLite, or memory with --ephemeral)
//! 3. Load the answer table
//! 4. Restore the conversation and run the terminal panel until EOF or /quit

mod cli;
mod commands;
mod view;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use chatdesk_chat::{ConversationStore, QaTable, ResponseResolver};
use chatdesk_core::config::ChatdeskConfig;
use chatdesk_core::types::AttachmentDescriptor;
use chatdesk_storage::{KeyValueStore, MemoryStore, SqliteStore};

use cli::CliArgs;
use commands::Command;
use view::PanelView;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn open_storage(
    config: &ChatdeskConfig,
    ephemeral: bool,
) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    if ephemeral {
        tracing::info!("Using in-memory storage; nothing will be saved");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let data_dir = resolve_data_dir(&config.general.data_dir);
    let db_path = data_dir.join(&config.storage.db_file);
    let db = SqliteStore::open(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok(Arc::new(db))
}

fn load_table(config: &ChatdeskConfig) -> Result<QaTable, Box<dyn std::error::Error>> {
    let table = match config.chat.responses_path {
        Some(ref path) => QaTable::load(&resolve_data_dir(path))?,
        None => QaTable::bundled()?,
    };
    tracing::info!(entries = table.len(), "Answer table ready");
    Ok(table)
}

/// Apply one gesture to the store or the view.
///
/// Returns `false` when the user asked to quit.
fn handle(command: Command, store: &ConversationStore, view: &mut PanelView) -> bool {
    match command {
        Command::Send(text) => {
            if store.append(&text).is_some() {
                view.open();
            }
        }
        Command::Attach(name) => store.attach(AttachmentDescriptor::new(name)),
        Command::Dismiss => store.clear_attachment(),
        Command::Recall(position) => {
            match view.recall_target(&store.messages(), position) {
                Some(message) => store.replace_history_with(message),
                None => eprintln!("No history entry {}", position),
            }
        }
        Command::Open => view.open(),
        Command::Close => view.close(),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => return false,
        Command::Invalid(reason) => eprintln!("{}", reason),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ChatdeskConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(path) = args.resolve_responses_path() {
        config.chat.responses_path = Some(path);
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing. Logs go to stderr so they stay out of the panel.
    let level = config.general.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Chatdesk v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let kv = open_storage(&config, args.ephemeral)?;
    let table = match load_table(&config) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without an answer table");
            return Err(e);
        }
    };
    let store = ConversationStore::initialize(kv, ResponseResolver::new(table))?;

    let mut view = PanelView::new(&config.chat);
    let mut events = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", view.render(&store.snapshot()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(commands::parse(&line), &store, &mut view) {
                    break;
                }
                // The command's own events are covered by this redraw.
                while events.try_recv().is_ok() {}
            }
            event = events.recv() => match event {
                Ok(event) => tracing::debug!(?event, "Store changed"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Store events lagged"),
                Err(RecvError::Closed) => break,
            },
        }
        println!("{}", view.render(&store.snapshot()));
    }

    tracing::info!("Chatdesk stopped");
    Ok(())
}
