//! # vocab-context CLI (`vctx`)
//!
//! The `vctx` binary manages a local document library and searches it
//! for vocabulary examples.
//!
//! ## Usage
//!
//! ```bash
//! vctx --config ./config/vctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vctx init` | Create the SQLite database and run schema migrations |
//! | `vctx add <paths..>` | Upload text or markdown files (directories are walked) |
//! | `vctx docs list` | List documents in upload order |
//! | `vctx docs show <id>` | Print a document |
//! | `vctx docs remove <id>` | Delete a document |
//! | `vctx search <word>` | Find and annotate example passages |
//! | `vctx history list` | Show recent searches |
//! | `vctx history rerun <n>` | Search the n-th most recent term again |
//! | `vctx history clear` | Forget recent searches |
//! | `vctx status` | Show library size and annotation readiness |
//!
//! ## Examples
//!
//! ```bash
//! # Snippets only, no model call
//! vctx search ambitious --no-annotate
//!
//! # Use a different model for one search
//! vctx search mitigate --model gemini-2.5-pro
//!
//! # Export to CSV
//! vctx search mitigate --format csv --output vocabulary.csv
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vocab_context::search::OutputFormat;
use vocab_context::{config, db, history, library, migrate, search, status};

/// vocab-context CLI: find vocabulary examples in your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "vctx",
    about = "vocab-context: find vocabulary examples in your own documents",
    version,
    long_about = "vocab-context keeps a local library of your reading material, finds \
    passages containing a word you are learning, and annotates each one with a translation \
    and the word's meaning in context using a language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vctx.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Upload documents into the library.
    ///
    /// Files are added as given. Directories are walked and filtered by
    /// `[library].include_globs` (markdown and text files by default).
    Add {
        /// Files or directories to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Inspect or remove documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Search the library for a word and annotate the examples found.
    Search {
        /// The word to look up. Matched case-insensitively as a substring.
        word: String,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Override the annotation model for this search.
        #[arg(long)]
        model: Option<String>,

        /// Skip the model call and print the raw snippets.
        #[arg(long)]
        no_annotate: bool,

        /// Write the output to this file (or into this directory).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage recent searches.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show library size and whether annotation is ready.
    Status,
}

/// Document subcommands.
#[derive(Subcommand)]
enum DocsAction {
    /// List documents in upload order.
    List,
    /// Print a document by id.
    Show {
        /// Document UUID.
        id: String,
    },
    /// Remove a document by id.
    Remove {
        /// Document UUID.
        id: String,
    },
}

/// History subcommands.
#[derive(Subcommand)]
enum HistoryAction {
    /// List recent searches, newest first.
    List,
    /// Search again for the n-th most recent term.
    Rerun {
        /// Position in `history list` (1 = most recent).
        n: usize,

        /// Skip the model call and print the raw snippets.
        #[arg(long)]
        no_annotate: bool,
    },
    /// Forget all recent searches.
    Clear,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    // Schema creation is idempotent, so every command ensures it
    migrate::run_migrations(&cfg).await?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized successfully.");
        }
        Commands::Add { paths } => {
            library::run_add(&cfg, &paths).await?;
        }
        Commands::Docs { action } => match action {
            DocsAction::List => library::run_list(&cfg).await?,
            DocsAction::Show { id } => library::run_show(&cfg, &id).await?,
            DocsAction::Remove { id } => library::run_remove(&cfg, &id).await?,
        },
        Commands::Search {
            word,
            format,
            model,
            no_annotate,
            output,
        } => {
            search::run_search(&cfg, &word, format, model, no_annotate, output).await?;
        }
        Commands::History { action } => match action {
            HistoryAction::List => history::run_list(&cfg).await?,
            HistoryAction::Clear => history::run_clear(&cfg).await?,
            HistoryAction::Rerun { n, no_annotate } => {
                let pool = db::connect(&cfg).await?;
                let term = history::nth_recent(&pool, n).await;
                pool.close().await;
                search::run_search(&cfg, &term?, OutputFormat::Text, None, no_annotate, None)
                    .await?;
            }
        },
        Commands::Status => {
            status::show_status(&cfg).await?;
        }
    }

    Ok(())
}
