//! CLI Module
//!
//! Command-line interface for the GameWav converter.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// GameWav - convert MP3/WAV/AIFF to 16-bit PCM WAV, optionally sorted into categories
#[derive(Parser, Debug)]
#[command(name = "gamewav")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Conversions running together in one group
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Pause between groups in milliseconds
    #[arg(long = "pause-ms", global = true)]
    pub pause_ms: Option<u64>,

    /// Write the batch report as JSON to this file
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert files one by one to <name>_UE.wav
    #[command(name = "convert")]
    Convert {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Convert files into categories and package them as one archive
    #[command(name = "export")]
    Export {
        /// Category and its inputs as NAME=PATH (repeatable)
        #[arg(long = "category", value_name = "NAME=PATH", value_parser = parse_category_input, required = true)]
        categories: Vec<CategoryInput>,

        /// Directory the archive is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// List accepted input extensions
    #[command(name = "formats")]
    Formats,
}

/// One `--category NAME=PATH` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub path: PathBuf,
}

fn parse_category_input(raw: &str) -> Result<CategoryInput, String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", raw))?;
    if path.trim().is_empty() {
        return Err(format!("missing path for category '{}'", name));
    }
    Ok(CategoryInput {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}
