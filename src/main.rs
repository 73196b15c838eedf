//! # Transfer Investigation CLI (`tia`)
//!
//! The `tia` binary drives the investigation pipeline from the command
//! line: database initialization, knowledge-base ingestion, one-off
//! investigations, and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! tia --config ./config/tia.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tia init` | Create the SQLite database and run schema migrations |
//! | `tia ingest` | Chunk and embed the knowledge base into the store |
//! | `tia investigate "<complaint>"` | Run a single investigation |
//! | `tia serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! tia init --config ./config/tia.toml
//!
//! # Ingest the knowledge base (idempotent; re-runs skip known chunks)
//! tia ingest
//!
//! # Preview what ingestion would do without writing anything
//! tia ingest --dry-run
//!
//! # Drop the store and re-embed everything
//! tia ingest --overwrite
//!
//! # Investigate a complaint and print the structured result
//! tia investigate "I sent $4,200 on Monday and it never arrived."
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use transfer_investigator::embedding::CohereEmbedder;
use transfer_investigator::generation::CohereGenerator;
use transfer_investigator::store::SqliteStore;
use transfer_investigator::{config, ingest, investigate, migrate, server};

/// Transfer Investigation Harness CLI.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tia.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tia",
    about = "Transfer Investigation Harness — retrieval-augmented investigation of stuck payment transfers",
    version,
    long_about = "Ingests internal payment-process documentation into a local vector store, then \
    investigates client complaints about stuck or failed transfers: retrieving the relevant \
    process rules, reconstructing the transfer timeline, naming the likely failure point, and \
    drafting a client-facing response for human review."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tia.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunks table. Idempotent —
    /// running it multiple times is safe.
    Init,

    /// Ingest the knowledge base.
    ///
    /// Loads documents from the configured docs root, chunks them, embeds
    /// new chunks via Cohere, and upserts them into the store. Chunk ids
    /// are deterministic, so re-running only embeds what is missing.
    Ingest {
        /// Drop the store first and re-embed everything from scratch.
        #[arg(long)]
        overwrite: bool,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Investigate a complaint and print the structured result as JSON.
    Investigate {
        /// The client complaint text.
        complaint: String,
    },

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `/ingest`, `/investigate`, and `/health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { overwrite, dry_run } => {
            let summary = if dry_run {
                // A dry run never talks to Cohere, so don't require a key.
                ingest::run_dry_run(&cfg)?
            } else {
                let store = SqliteStore::connect(&cfg).await?;
                let embedder = CohereEmbedder::new(&cfg.cohere)?;
                ingest::run_ingest(&cfg, &store, &embedder, overwrite, false).await?
            };
            println!("{}", summary.message);
        }
        Commands::Investigate { complaint } => {
            let min_len = cfg.retrieval.min_complaint_len;
            if complaint.trim().chars().count() < min_len {
                anyhow::bail!("complaint must be at least {} characters", min_len);
            }

            let store = SqliteStore::connect(&cfg).await?;
            let embedder = CohereEmbedder::new(&cfg.cohere)?;
            let generator = CohereGenerator::new(&cfg.cohere)?;

            let result = investigate::run_investigation(
                &cfg,
                &store,
                &embedder,
                &generator,
                complaint.trim(),
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
