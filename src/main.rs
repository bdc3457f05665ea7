//! Hotspec - A shared incremental compile broker for interactive test runners.

mod actor;
mod cli;
mod compiler;
mod config;
mod core;
mod logger;
mod protocol;
mod requester;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::HotspecConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(HotspecConfig::load(&cli)?);
    debug!("config"; "root: {}", config.get_root().display());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async {
        match &cli.command {
            Commands::Serve { .. } => cli::serve::serve(config).await,
            Commands::Preprocess { args } => cli::preprocess::preprocess(&config, args).await,
        }
    })
}
