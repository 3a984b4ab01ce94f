//! Command implementations for all querytune commands

use crate::cli::{AnalyzeArgs, Commands, CompareArgs, ConfigArgs, OptimizeArgs};
use crate::commands::dispatch::command::{Command, CommandContext};
use crate::commands::{analyze, compare, config, optimize};
use querytune_core::error::Result;
use querytune_core::trace_time;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let result = match self {
            Commands::Analyze(args) => execute_analyze(ctx, args),
            Commands::Compare(args) => execute_compare(ctx, args),
            Commands::Optimize(args) => execute_optimize(ctx, args),
            Commands::Config(args) => execute_config(ctx, args),
        };
        trace_time!(ctx.start, "command_complete");
        result
    }
}

fn execute_analyze(ctx: &CommandContext, args: &AnalyzeArgs) -> Result<()> {
    let config = ctx.load_config()?;
    analyze::execute(ctx.cli, &config, &args.profile)
}

fn execute_compare(ctx: &CommandContext, args: &CompareArgs) -> Result<()> {
    compare::execute(ctx.cli, &args.original, &args.optimized)
}

fn execute_optimize(ctx: &CommandContext, args: &OptimizeArgs) -> Result<()> {
    let config = ctx.load_config()?;
    optimize::execute(ctx.cli, config, args)
}

fn execute_config(ctx: &CommandContext, args: &ConfigArgs) -> Result<()> {
    config::execute(ctx.cli, args)
}
