//! `querytune config` command

use std::path::Path;

use serde_json::json;

use crate::cli::{Cli, ConfigArgs};
use querytune_core::config::OptimizerConfig;
use querytune_core::error::{QueryTuneError, Result};
use querytune_core::format::OutputFormat;

/// Execute the config command
pub fn execute(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => OptimizerConfig::default_path()?,
    };

    if args.init {
        return init_config(cli, &path, args.force);
    }

    let config = OptimizerConfig::resolve(cli.config.as_deref())?;
    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "path": path.display().to_string(),
                "exists": path.exists(),
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if !cli.quiet {
                let origin = if path.exists() { "" } else { " (not found, showing defaults)" };
                println!("# {}{}", path.display(), origin);
            }
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

fn init_config(cli: &Cli, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(QueryTuneError::UsageError(format!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    OptimizerConfig::default().save(path)?;
    tracing::info!(path = %path.display(), "wrote default configuration");

    match cli.format {
        OutputFormat::Json => {
            let output = json!({ "path": path.display().to_string(), "created": true });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!("Wrote default configuration to {}", path.display());
            }
        }
    }
    Ok(())
}
