//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod extract;
mod run;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{LoadOptions, Settings};
use crate::services::ValidationMode;

pub use run::RunOverrides;

#[derive(Parser)]
#[command(name = "stixtract")]
#[command(about = "Extract PDF text and annotate it with STIX entity graphs")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "STIXTRACT_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk and annotate a PDF, writing annotations to the output file
    Run {
        /// PDF to process (overrides source_path)
        source: Option<PathBuf>,
        /// Output file (overrides output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// LLM endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Model (or Azure deployment) name
        #[arg(long)]
        model: Option<String>,
        /// Maximum tokens per response
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Keep going after a chunk fails instead of aborting
        #[arg(long)]
        continue_on_error: bool,
        /// STIX response validation
        #[arg(long, value_enum)]
        validate: Option<ValidationMode>,
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Extract text from a PDF (native text layer or OCR) and print it
    Extract {
        /// PDF to read
        source: PathBuf,
        /// Only report whether the PDF is text-based or image-based
        #[arg(long)]
        classify_only: bool,
        /// Write the text to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how a PDF's text would be chunked
    Chunk {
        /// PDF to read
        source: PathBuf,
        /// Characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Check that the external OCR and PDF tools are available
    Tools,

    /// Show the effective configuration
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&LoadOptions {
        config_path: cli.config.clone(),
        use_cwd: cli.cwd,
    })
    .await?;

    match cli.command {
        Commands::Run {
            source,
            output,
            chunk_size,
            endpoint,
            model,
            max_tokens,
            continue_on_error,
            validate,
            no_progress,
        } => {
            let overrides = RunOverrides {
                source,
                output,
                chunk_size,
                endpoint,
                model,
                max_tokens,
                continue_on_error,
                validate,
            };
            run::cmd_run(settings, overrides, !no_progress).await
        }
        Commands::Extract {
            source,
            classify_only,
            output,
        } => extract::cmd_extract(&settings, &source, classify_only, output.as_deref()),
        Commands::Chunk { source, chunk_size } => {
            extract::cmd_chunk(&settings, &source, chunk_size)
        }
        Commands::Tools => tools::cmd_tools(&settings),
        Commands::Config => config_cmd::cmd_config(&settings),
    }
}
