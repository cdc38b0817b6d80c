//! stepgraph CLI entry point
//!
//! Drives the same event reducer the interactive front end uses: submit and
//! expansion fetches are spawned tasks whose completions re-enter through
//! the event channel, with the CLI acting as the event loop.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use stepgraph::cli::{Cli, Command, HistoryCommand, OutputFormat, get_log_path};
use stepgraph::client::{AnalysisClient, HttpAnalysisClient};
use stepgraph::config::Config;
use stepgraph::history::HistoryStore;
use stepgraph::tree::NodeId;
use stepgraph::view::{ViewEvent, ViewSync};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("stepgraph loaded config: service={}", config.service.base_url);

    match cli.command {
        Command::Solve { text, expand, format } => cmd_solve(&config, &text, &expand, format).await,
        Command::History { command } => match command {
            HistoryCommand::List { format } => cmd_history_list(&config, format).await,
            HistoryCommand::Show { id, format } => cmd_history_show(&config, id, format).await,
            HistoryCommand::Clear => cmd_history_clear(&config).await,
        },
    }
}

/// Submit a solution, optionally expand steps, print the result
async fn cmd_solve(config: &Config, text: &str, expand: &[usize], format: OutputFormat) -> Result<()> {
    let client: Arc<dyn AnalysisClient> =
        Arc::new(HttpAnalysisClient::from_config(&config.service).context("Failed to create analysis client")?);
    let history = HistoryStore::load(&config.storage.history_file).await;

    let (tx, mut rx) = mpsc::channel(32);
    let mut sync = ViewSync::new(client, history, tx);

    // Submit and wait for the root decomposition to resolve
    sync.handle_event(ViewEvent::Submit { text: text.to_string() }).await;
    while sync.is_submitting() {
        match rx.recv().await {
            Some(event) => sync.handle_event(event).await,
            None => break,
        }
    }

    if let Some(notice) = sync.take_notice() {
        eprintln!("{}", notice);
        std::process::exit(1);
    }

    // Expand requested steps one at a time
    for step in expand {
        let id = NodeId::root(*step);
        if !sync.tree().contains(&id) {
            eprintln!("No such step: {}", step);
            continue;
        }
        sync.handle_event(ViewEvent::NodeActivated { id: id.clone() }).await;
        while sync.is_loading(&id) {
            match rx.recv().await {
                Some(event) => sync.handle_event(event).await,
                None => break,
            }
        }
        if let Some(notice) = sync.take_notice() {
            eprintln!("{}", notice);
        }
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sync.graph_view())?);
        }
        OutputFormat::Text => {
            if sync.tree().is_empty() {
                println!("The service returned no steps.");
                return Ok(());
            }
            for row in sync.list_view() {
                let indent = "  ".repeat(row.depth);
                if row.explanation.is_empty() {
                    println!("{}{}. {}", indent, row.id, row.math);
                } else {
                    println!("{}{}. {}  ({})", indent, row.id, row.math, row.explanation);
                }
            }
        }
    }

    Ok(())
}

/// List cached analyses
async fn cmd_history_list(config: &Config, format: OutputFormat) -> Result<()> {
    let history = HistoryStore::load(&config.storage.history_file).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(history.entries())?);
        }
        OutputFormat::Text => {
            if history.is_empty() {
                println!("No cached analyses.");
                return Ok(());
            }
            for entry in history.entries() {
                println!(
                    "{}  {}  [{} steps]  {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.root_steps.len(),
                    entry.query
                );
            }
        }
    }

    Ok(())
}

/// Show one cached analysis
async fn cmd_history_show(config: &Config, id: i64, format: OutputFormat) -> Result<()> {
    let history = HistoryStore::load(&config.storage.history_file).await;

    let Some(entry) = history.find(id) else {
        eprintln!("No history entry with id {}", id);
        std::process::exit(1);
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
        OutputFormat::Text => {
            println!("Query: {}", entry.query);
            println!("Recorded: {}", entry.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!();
            for (idx, step) in entry.root_steps.iter().enumerate() {
                if step.explanation.is_empty() {
                    println!("{}. {}", idx, step.math);
                } else {
                    println!("{}. {}  ({})", idx, step.math, step.explanation);
                }
            }
        }
    }

    Ok(())
}

/// Clear the cached history
async fn cmd_history_clear(config: &Config) -> Result<()> {
    let mut history = HistoryStore::load(&config.storage.history_file).await;
    let count = history.len();
    history.clear().await.context("Failed to clear history")?;
    println!("Removed {} cached analyses.", count);
    Ok(())
}
