//! contextfit CLI — the main entry point.
//!
//! Commands:
//! - `onboard`   — Initialize config & workspace root
//! - `status`    — Show resolved configuration
//! - `doctor`    — Diagnose setup
//! - `models`    — List the model catalog
//! - `budget`    — Fit a session and print its token budget
//! - `ask`       — Ask a question about the code
//! - `architect` — Request a design or plan
//! - `code`      — Request code edits

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use contextfit_core::InteractionKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "contextfit",
    about = "contextfit — fit code assistant sessions into a model's context window",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Files and limits shared by every session-building command.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Working directory, relative to the configured session root
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Model to use instead of the configured default
    #[arg(short, long)]
    model: Option<String>,

    /// File the model may edit (repeatable)
    #[arg(short, long = "write", value_name = "FILE")]
    write: Vec<String>,

    /// Read-only context file, most important first (repeatable)
    #[arg(short, long = "read", value_name = "FILE")]
    read: Vec<String>,

    /// Tokens reserved for the reply
    #[arg(long)]
    write_tokens: Option<usize>,

    /// Return an overflowing session instead of failing
    #[arg(long)]
    lenient: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace root
    Onboard,

    /// Show resolved configuration
    Status,

    /// Diagnose setup
    Doctor,

    /// List known models with pricing and context size
    Models,

    /// Fit a session and print its token budget
    Budget {
        #[command(flatten)]
        session: SessionArgs,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a question about the code
    Ask {
        text: String,
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Request a design or plan
    Architect {
        text: String,
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Request code edits
    Code {
        text: String,
        #[command(flatten)]
        session: SessionArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Status => commands::status::run()?,
        Commands::Doctor => commands::doctor::run()?,
        Commands::Models => commands::models::run()?,
        Commands::Budget { session, json } => commands::budget::run(&session, json)?,
        Commands::Ask { text, session } => {
            commands::interact::run(InteractionKind::Ask, &text, &session)?
        }
        Commands::Architect { text, session } => {
            commands::interact::run(InteractionKind::Architect, &text, &session)?
        }
        Commands::Code { text, session } => {
            commands::interact::run(InteractionKind::Code, &text, &session)?
        }
    }

    Ok(())
}
