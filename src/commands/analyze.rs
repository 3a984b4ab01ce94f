//! `querytune analyze` command
//!
//! Loads a profile, extracts metrics and reports bottlenecks without
//! contacting a language model.

use std::path::Path;

use serde_json::{json, Value};

use crate::cli::Cli;
use querytune_core::bottleneck::{self, BottleneckIndicator};
use querytune_core::config::OptimizerConfig;
use querytune_core::error::{QueryTuneError, Result};
use querytune_core::format::OutputFormat;
use querytune_core::metrics::{profile, ExtractedMetrics, ProfileFormat};
use querytune_core::report;

/// A loaded profile with its extracted metrics and detected bottlenecks
pub struct ProfileAnalysis {
    pub data: Value,
    pub format: ProfileFormat,
    pub extracted: ExtractedMetrics,
    pub indicators: Vec<BottleneckIndicator>,
}

/// Load `path` and run bottleneck detection over it
pub fn load_and_analyze(path: &str, config: &OptimizerConfig) -> Result<ProfileAnalysis> {
    let data = profile::load_profile(Path::new(path))?;

    let format = profile::detect_format(&data);
    if format == ProfileFormat::Unknown {
        return Err(QueryTuneError::InvalidProfile {
            path: profile::resolve_path(path),
            reason: "unrecognized profile format (expected a query summary or SQL profiler export)"
                .to_string(),
        });
    }

    let extracted = profile::extract_metrics(&data);
    let indicators = bottleneck::analyze(&extracted, &config.bottleneck);

    Ok(ProfileAnalysis {
        data,
        format,
        extracted,
        indicators,
    })
}

/// Execute the analyze command
pub fn execute(cli: &Cli, config: &OptimizerConfig, path: &str) -> Result<()> {
    let analysis = load_and_analyze(path, config)?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis_json(&analysis))?);
        }
        OutputFormat::Human => {
            let generated_at = chrono::Local::now().naive_local();
            print!(
                "{}",
                report::format_optimization_report(
                    &analysis.extracted,
                    &analysis.indicators,
                    None,
                    generated_at,
                )
            );
        }
    }

    Ok(())
}

fn analysis_json(analysis: &ProfileAnalysis) -> Value {
    json!({
        "format": analysis.format,
        "query_id": profile::extract_query_id(&analysis.data),
        "metrics": analysis.extracted.query,
        "top_nodes": report::rank_top_nodes(&analysis.extracted),
        "shuffles": analysis.extracted.shuffles,
        "bottlenecks": analysis.indicators,
    })
}
