//! Command argument structures

use std::path::PathBuf;

use clap::Args;

use crate::cli::parse::{parse_attempts, parse_provider};
use querytune_core::config::Provider;

/// Arguments for the analyze command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Query profile JSON (dbfs:/ and /FileStore/ paths are mapped to /dbfs)
    pub profile: String,
}

/// Arguments for the compare command.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Metrics (or profile) JSON of the original query
    pub original: String,

    /// Metrics (or profile) JSON of the rewritten query
    pub optimized: String,
}

/// Arguments for the optimize command.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Query profile JSON (dbfs:/ and /FileStore/ paths are mapped to /dbfs)
    pub profile: String,

    /// Read the original SQL from this file instead of the profile
    #[arg(long)]
    pub query: Option<PathBuf>,

    /// Number of rewrite rounds (overrides the config file)
    #[arg(long, value_parser = parse_attempts)]
    pub max_attempts: Option<u32>,

    /// Text-generation provider (overrides the config file)
    #[arg(long, value_parser = parse_provider)]
    pub provider: Option<Provider>,

    /// Command that receives candidate SQL on stdin and prints
    /// {"explain": "...", "metrics": {...}} on stdout
    #[arg(long)]
    pub explain_cmd: Option<String>,

    /// Save the report and SQL files into this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Save the report and SQL files into the configured output directory
    #[arg(long)]
    pub save: bool,
}

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the default configuration to the config path
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing config file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}
