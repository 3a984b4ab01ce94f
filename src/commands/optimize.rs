//! `querytune optimize` command
//!
//! Analyzes the profile, then runs the iterative rewrite loop against the
//! configured provider. Ctrl-C stops the loop before its next round; the
//! result assembled so far is still reported.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{info, warn};

use crate::cli::{Cli, OptimizeArgs};
use crate::commands::analyze::{load_and_analyze, ProfileAnalysis};
use crate::commands::explain::CommandExplainHook;
use querytune_core::bottleneck;
use querytune_core::config::OptimizerConfig;
use querytune_core::error::{QueryTuneError, Result};
use querytune_core::format::OutputFormat;
use querytune_core::llm::create_client;
use querytune_core::metrics::profile;
use querytune_core::optimize::{IterativeOptimizer, OptimizationResult, QueryGenerator};
use querytune_core::report::{self, SavedArtifacts};
use querytune_core::{bail_usage, trace_time};

/// Execute the optimize command
pub fn execute(cli: &Cli, mut config: OptimizerConfig, args: &OptimizeArgs) -> Result<()> {
    let start = Instant::now();

    apply_overrides(&mut config, args);
    config.validate()?;

    let analysis = load_and_analyze(&args.profile, &config)?;
    let original_query = resolve_query(args, &analysis)?;
    let bottleneck_report = bottleneck::format_report(&analysis.indicators);
    trace_time!(start, "analysis_complete");

    let hook = args
        .explain_cmd
        .as_deref()
        .map(CommandExplainHook::new)
        .transpose()?;

    let client = create_client(&config.llm, config.max_retries)?;
    let generator = QueryGenerator::new(client);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    let _ = ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    });

    let mut optimizer =
        IterativeOptimizer::new(generator, &config).with_cancel_flag(Arc::clone(&interrupted));
    if let Some(hook) = hook {
        optimizer = optimizer.with_explain_hook(hook);
    }

    let result = optimizer.run(&original_query, &analysis.extracted.query, &bottleneck_report)?;
    let was_interrupted = interrupted.load(Ordering::SeqCst);
    if was_interrupted {
        warn!(attempts = result.attempts.len(), "optimization interrupted");
    }
    trace_time!(start, "optimization_complete", attempts = result.attempts.len());

    let generated_at = chrono::Local::now().naive_local();
    let report = report::format_optimization_report(
        &analysis.extracted,
        &analysis.indicators,
        Some(&result),
        generated_at,
    );

    let saved = match output_dir(args, &config) {
        Some(dir) => {
            let query_id = profile::extract_query_id(&analysis.data);
            Some(report::save_artifacts(
                &dir,
                &result,
                &report,
                &query_id,
                generated_at,
            )?)
        }
        None => None,
    };

    let outcome = RunOutcome {
        provider: config.llm.provider.as_str(),
        interrupted: was_interrupted,
        result: &result,
        report: &report,
        saved: saved.as_ref(),
    };
    print_outcome(cli, &outcome)
}

struct RunOutcome<'a> {
    provider: &'a str,
    interrupted: bool,
    result: &'a OptimizationResult,
    report: &'a str,
    saved: Option<&'a SavedArtifacts>,
}

fn apply_overrides(config: &mut OptimizerConfig, args: &OptimizeArgs) {
    if let Some(max_attempts) = args.max_attempts {
        config.max_optimization_attempts = max_attempts;
    }
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
}

/// Original SQL from `--query`, else the profile's query text
fn resolve_query(args: &OptimizeArgs, analysis: &ProfileAnalysis) -> Result<String> {
    let query = match &args.query {
        Some(path) => {
            if !path.exists() {
                return Err(QueryTuneError::not_found("query file", path.display()));
            }
            fs::read_to_string(path)
                .map_err(|e| QueryTuneError::io_operation("read query file", path.display(), e))?
        }
        None => profile::extract_query_text(&analysis.data),
    };

    let query = query.trim().to_string();
    if query.is_empty() {
        bail_usage!("no query text found in the profile; pass --query <FILE>");
    }
    info!(chars = query.len(), "resolved original query");
    Ok(query)
}

fn output_dir(args: &OptimizeArgs, config: &OptimizerConfig) -> Option<PathBuf> {
    args.output_dir
        .clone()
        .or_else(|| args.save.then(|| PathBuf::from(&config.output_dir)))
}

fn print_outcome(cli: &Cli, outcome: &RunOutcome) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "provider": outcome.provider,
                "interrupted": outcome.interrupted,
                "result": outcome.result,
                "saved": outcome.saved,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            print!("{}", outcome.report);
            if cli.quiet {
                return Ok(());
            }
            if outcome.interrupted {
                println!();
                println!("Optimization interrupted; showing attempts completed so far.");
            }
            if let Some(saved) = outcome.saved {
                println!();
                println!("Saved original query: {}", saved.original_sql.display());
                if let Some(optimized) = &saved.optimized_sql {
                    println!("Saved optimized query: {}", optimized.display());
                }
                println!("Saved report: {}", saved.report.display());
            }
        }
    }
    Ok(())
}
