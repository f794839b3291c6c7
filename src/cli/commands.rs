//! CLI command implementations
//!
//! Each command loads the config, assembles the engine from it, runs, and
//! prints a human-line summary to stderr (the document stream owns stdout).

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::checkpoint::{CheckpointManager, CheckpointToken};
use crate::config::FeedConfig;
use crate::content::Materializer;
use crate::document::DocumentBuilder;
use crate::identity::{self, DocumentId};
use crate::scan::{JsonLinesSink, ScanEngine, ScanStats};
use crate::snapshot::SnapshotStore;

use super::errors::{CliError, CliResult};

fn build_engine(config: &FeedConfig) -> ScanEngine {
    let builder = DocumentBuilder::new(config.builder_config());
    let materializer = Materializer::new(
        config.digest,
        config.chunk_size,
        config.spill_threshold,
        config.spool_dir(),
    );
    ScanEngine::new(
        builder,
        materializer,
        SnapshotStore::new(config.data_dir.clone()),
        CheckpointManager::open(&config.data_dir),
        config.batch_size,
    )
}

fn open_sink(output: Option<&PathBuf>) -> CliResult<JsonLinesSink<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path).map_err(CliError::io)?),
        None => Box::new(io::stdout()),
    };
    Ok(JsonLinesSink::new(writer))
}

fn print_summary(stats: &ScanStats) {
    eprintln!(
        "scan complete: {} rows, {} adds, {} deletes, {} unchanged, {} skipped, {} ms",
        stats.rows_seen,
        stats.adds_delivered,
        stats.deletes_delivered,
        stats.unchanged,
        stats.skipped_total(),
        stats.duration_ms
    );
}

/// `tablefeed scan`
pub fn scan(config_path: &Path, output: Option<&PathBuf>) -> CliResult<()> {
    let config = FeedConfig::load(config_path).map_err(CliError::config)?;
    let mut source = config.inline_source().map_err(CliError::config)?;
    let mut engine = build_engine(&config);
    let mut sink = open_sink(output)?;

    let stats = engine
        .run_scan(&mut source, &mut sink)
        .map_err(CliError::scan)?;
    print_summary(&stats);
    Ok(())
}

/// `tablefeed resume`
pub fn resume(
    config_path: &Path,
    token: Option<&str>,
    output: Option<&PathBuf>,
) -> CliResult<()> {
    let config = FeedConfig::load(config_path).map_err(CliError::config)?;
    let mut source = config.inline_source().map_err(CliError::config)?;
    let mut engine = build_engine(&config);

    let position = match token {
        Some(token) => {
            let token = CheckpointToken::from_string(token);
            CheckpointManager::resume_from(&token).map_err(CliError::decode)?
        }
        None => engine
            .stored_resume_position()
            .map_err(CliError::scan)?
            .ok_or_else(CliError::no_checkpoint)?,
    };

    let mut sink = open_sink(output)?;
    let stats = engine
        .resume(&mut source, &mut sink, position)
        .map_err(CliError::scan)?;
    print_summary(&stats);
    Ok(())
}

/// `tablefeed status`
pub fn status(config_path: &Path) -> CliResult<()> {
    let config = FeedConfig::load(config_path).map_err(CliError::config)?;

    let snapshot = SnapshotStore::new(config.data_dir.clone())
        .load()
        .map_err(CliError::scan)?;
    println!("snapshot: {} documents", snapshot.len());

    let checkpoint = CheckpointManager::open(&config.data_dir);
    match checkpoint.stored_position().map_err(CliError::scan)? {
        Some(position) => {
            println!(
                "checkpoint: interrupted scan from {}, last acked {}",
                position.scan_started_at.to_rfc3339(),
                position
                    .last_acked
                    .as_ref()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        None => println!("checkpoint: none (last scan committed)"),
    }
    Ok(())
}

/// `tablefeed decode-id`
pub fn decode_id(id: &str) -> CliResult<()> {
    let decoded =
        identity::decode(&DocumentId::from_encoded(id)).map_err(CliError::decode)?;
    println!("{}", decoded);
    Ok(())
}
