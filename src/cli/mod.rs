//! CLI module - Command-line interface for manhwa-harvest
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// manhwa-harvest - incremental AniList manhwa catalog harvester
#[derive(Parser)]
#[command(name = "manhwa-harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch new entries, write today's snapshot and update the accumulation
    #[command(alias = "run")]
    Harvest(HarvestArgs),

    /// Show the current accumulation
    #[command(alias = "st")]
    Status {
        /// Output directory to inspect
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Create default config file
    Init,
}

#[derive(Args, Default)]
pub struct HarvestArgs {
    /// Only fetch entries that started after this year
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Maximum number of new entries to fetch
    #[arg(long)]
    pub limit: Option<usize>,

    /// Directory for snapshot and accumulation files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub use commands::*;
