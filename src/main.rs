//! # ragchat CLI
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat build` | Ingest the corpus and rebuild the persisted index |
//! | `ragchat query "<text>"` | Show the nearest chunks with their scores |
//! | `ragchat ask "<question>"` | Answer one question and exit |
//! | `ragchat chat` | Interactive chat session on stdin/stdout |
//!
//! `query` never calls a remote service. `ask` and `chat` need the
//! completion and web search API keys in the environment.

use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use ragchat::{chat, commands, config, logging};

/// Retrieval-augmented chatbot over a local document corpus with web
/// search fallback.
#[derive(Parser)]
#[command(name = "ragchat", version, about = "Retrieval-augmented chat over local documents")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the corpus and rebuild the index from scratch.
    Build,

    /// Print the nearest indexed chunks for a query.
    Query {
        text: String,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<NonZeroUsize>,
    },

    /// Answer a single question.
    Ask {
        text: String,

        #[arg(long)]
        top_k: Option<NonZeroUsize>,
    },

    /// Start an interactive session.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let cfg = config::load_config(&cli.config)?;
    let default_top_k = cfg.retrieval.top_k()?;

    match cli.command {
        Commands::Build => commands::run_build(&cfg).await?,
        Commands::Query { text, top_k } => {
            commands::run_query(&cfg, &text, top_k.unwrap_or(default_top_k)).await?
        }
        Commands::Ask { text, top_k } => {
            commands::run_ask(&cfg, &text, top_k.unwrap_or(default_top_k)).await?
        }
        Commands::Chat => chat::run_chat(&cfg).await?,
    }

    Ok(())
}
