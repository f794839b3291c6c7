//! CLI argument definitions using clap
//!
//! Commands:
//! - tablefeed scan --config <path> [--output <path>]
//! - tablefeed resume --config <path> [--token <token>] [--output <path>]
//! - tablefeed status --config <path>
//! - tablefeed decode-id <id>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablefeed - incremental table-to-document feed pipeline
#[derive(Parser, Debug)]
#[command(name = "tablefeed")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a full scan and emit the delivered document stream
    Scan {
        /// Path to configuration file
        #[arg(long, default_value = "./tablefeed.json")]
        config: PathBuf,

        /// Write delivered documents to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Resume an interrupted scan from the stored checkpoint (or a token)
    Resume {
        /// Path to configuration file
        #[arg(long, default_value = "./tablefeed.json")]
        config: PathBuf,

        /// Resume token held by the consumer; defaults to the stored marker
        #[arg(long)]
        token: Option<String>,

        /// Write delivered documents to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show snapshot and checkpoint state for a source
    Status {
        /// Path to configuration file
        #[arg(long, default_value = "./tablefeed.json")]
        config: PathBuf,
    },

    /// Decode a document id back to its joined primary-key text
    DecodeId {
        /// The encoded document id
        id: String,
    },
}
