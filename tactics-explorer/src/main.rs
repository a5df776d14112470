//! Tactics Explorer - Main entry point
//!
//! Loads a tactical profile dataset, applies a selection given on the command
//! line (leagues, attributes, weights, clusters, brushes, search, sort, page)
//! and prints the resulting view slices as JSON.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tactics_common::config::{ConfigResolver, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod explore;

use cli::Args;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!(
            "tactics_explorer={0},tactics_engine={0},tactics_common={0}",
            logging.level
        )));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved before logging exists, so its own messages go unseen
    let config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!("Starting tactics-explorer on {}", args.data.display());

    let rows = explore::read_rows(&args.data)?;
    let mut manager = explore::load(&rows, config);
    explore::apply(&mut manager, &args)?;

    let output = explore::render(&manager, &args.views)?;
    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}
