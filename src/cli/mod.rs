//! CLI argument parsing for querytune
//!
//! Global flags: --format, --quiet, --verbose, --log-level, --log-json, --config

pub mod args;
pub mod parse;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use querytune_core::format::OutputFormat;

pub use args::{AnalyzeArgs, CompareArgs, ConfigArgs, OptimizeArgs};
use parse::parse_output_format;

/// Querytune - Spark SQL profile analysis and LLM-assisted query rewriting
#[derive(Parser, Debug)]
#[command(name = "querytune")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (human or json)
    #[arg(long, global = true, value_parser = parse_output_format, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (overrides --verbose)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to the configuration file
    #[arg(long, global = true, env = "QUERYTUNE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report metrics and bottlenecks for a query profile
    Analyze(AnalyzeArgs),

    /// Compare two metrics files and recommend a query
    Compare(CompareArgs),

    /// Iteratively rewrite the profiled query with a language model
    Optimize(OptimizeArgs),

    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "querytune",
            "compare",
            "a.json",
            "b.json",
            "--format",
            "json",
            "-q",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Some(Commands::Compare(_))));
    }

    #[test]
    fn test_optimize_overrides() {
        let cli = Cli::try_parse_from([
            "querytune",
            "optimize",
            "profile.json",
            "--max-attempts",
            "5",
            "--provider",
            "anthropic",
            "--explain-cmd",
            "./explain.sh --warehouse w1",
        ])
        .unwrap();
        let Some(Commands::Optimize(args)) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.max_attempts, Some(5));
        assert_eq!(
            args.provider,
            Some(querytune_core::config::Provider::Anthropic)
        );
        assert_eq!(args.explain_cmd.as_deref(), Some("./explain.sh --warehouse w1"));
    }

    #[test]
    fn test_bad_provider_rejected() {
        let err = Cli::try_parse_from(["querytune", "optimize", "p.json", "--provider", "cohere"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
