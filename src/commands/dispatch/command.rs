//! Command trait and context for dispatching commands

use std::time::Instant;

use crate::cli::Cli;
use querytune_core::config::OptimizerConfig;
use querytune_core::error::Result;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, start: Instant) -> Self {
        Self { cli, start }
    }

    /// Load the configuration named by `--config`, or the default location
    pub fn load_config(&self) -> Result<OptimizerConfig> {
        OptimizerConfig::resolve(self.cli.config.as_deref())
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("querytune {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Spark SQL profile analysis and LLM-assisted query rewriting.");
        println!();
        println!("Run `querytune --help` for usage information.");
        Ok(())
    }
}
