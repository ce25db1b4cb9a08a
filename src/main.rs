//! # RAG Anything CLI (`rag`)
//!
//! Operator interface over the retrieval engine and the conversation store.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the corpus roots and the history directory |
//! | `rag search "<query>"` | Build the context payload for a query |
//! | `rag stats` | Article, project, and conversation counts |
//! | `rag history show <date>` | Conversations of one day, oldest first |
//! | `rag history recent` | Conversations of the last N days, newest first |
//! | `rag history stats` | Per-day counts and first/last timestamps |
//! | `rag history delete <date>` | Remove one day log |
//! | `rag history save` | Record an exchange |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG=info` (or
//! `debug`) for more detail. Stdout carries only command output.

use clap::{Parser, Subcommand};
use rag_anything::{config, history, retrieve, scanner, stats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RAG Anything CLI: file-based context retrieval and conversation history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults rooted at
/// `./rag-data` are used.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "RAG Anything — file-based context retrieval and conversation history",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the corpus roots and the history directory.
    ///
    /// Idempotent: existing directories are left untouched.
    Init,

    /// Build the context payload for a query.
    ///
    /// Scans the corpus, keeps relevant articles and project files, and
    /// prints them with their source labels.
    Search {
        /// The query string.
        query: String,

        /// Print the payload as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show article, project, and conversation counts.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read, record, and delete conversation history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Conversations recorded on one date (YYYY-MM-DD), oldest first.
    Show {
        date: String,
        #[arg(long)]
        json: bool,
    },

    /// Conversations from the last N days (including today), newest first.
    Recent {
        /// Number of days; defaults to `[history].recent_days`.
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },

    /// Totals, per-day counts, and first/last conversation timestamps.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Delete the day log for one date (YYYY-MM-DD).
    Delete { date: String },

    /// Record a question/answer exchange.
    Save {
        #[arg(long)]
        question: String,

        #[arg(long)]
        answer: String,

        /// ISO-8601 timestamp; defaults to the current local time.
        #[arg(long)]
        timestamp: Option<String>,

        /// Source label; repeat for several.
        #[arg(long = "source")]
        sources: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let scanner = scanner::DocumentScanner::from_config(&cfg)?;
            scanner.ensure_roots()?;
            let store = history::ConversationStore::from_config(&cfg)?;
            println!("Initialized:");
            println!("  articles: {}", scanner.articles_dir().display());
            println!("  projects: {}", scanner.projects_dir().display());
            println!("  history:  {}", store.dir().display());
        }
        Commands::Search { query, json } => {
            retrieve::run_search(&cfg, &query, json)?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json)?;
        }
        Commands::History { action } => match action {
            HistoryAction::Show { date, json } => {
                history::run_show(&cfg, &date, json)?;
            }
            HistoryAction::Recent { days, json } => {
                history::run_recent(&cfg, days, json)?;
            }
            HistoryAction::Stats { json } => {
                history::run_history_stats(&cfg, json)?;
            }
            HistoryAction::Delete { date } => {
                history::run_delete(&cfg, &date)?;
            }
            HistoryAction::Save {
                question,
                answer,
                timestamp,
                sources,
            } => {
                history::run_save(&cfg, &question, &answer, timestamp, &sources)?;
            }
        },
    }

    Ok(())
}
