//! xdt CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "xdt")]
#[command(version)]
#[command(about = "Apply XML Document Transforms while keeping the source formatting", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a transform document to a source document
    Apply {
        /// Document to transform
        #[arg(short, long)]
        source: String,

        /// Transform document
        #[arg(short, long)]
        transform: String,

        /// Write the result to FILE instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// TOML file with transform options
        #[arg(short, long)]
        config: Option<String>,

        /// Report diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the directives of a transform document
    Check {
        /// Transform document
        #[arg(short, long)]
        transform: String,

        /// Report diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "xdt=debug" } else { "xdt=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let succeeded = match cli.command {
        Commands::Apply {
            source,
            transform,
            output,
            config,
            json,
        } => commands::apply::execute(commands::apply::ApplyArgs {
            source,
            transform,
            output,
            config,
            json,
        })?,
        Commands::Check { transform, json } => {
            commands::check::execute(commands::check::CheckArgs { transform, json })?
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
