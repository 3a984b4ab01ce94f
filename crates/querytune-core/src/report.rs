//! Markdown reports and persisted artifacts for an optimization run

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::info;

use crate::bottleneck::{format_report, BottleneckIndicator};
use crate::compare::{PerformanceComparison, SIGNIFICANT_THRESHOLD};
use crate::error::{QueryTuneError, Result};
use crate::format::{format_bytes, format_count};
use crate::metrics::ExtractedMetrics;
use crate::optimize::{OptimizationAttempt, OptimizationResult};

mod top_nodes;

pub use top_nodes::{
    format_top_nodes, rank_top_nodes, total_time, NodeSeverity, RankedNode, TimeBasis,
    TopNodeRanking,
};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Query ids are shortened to this many characters in file names
const SHORT_ID_LEN: usize = 8;

/// Recommendations listed at the end of the full report
const MAX_RECOMMENDATIONS: usize = 5;

/// Table of every attempt, failed ones included
pub fn format_attempts_summary(attempts: &[OptimizationAttempt]) -> String {
    let mut lines = vec![
        "## Optimization Attempt History".to_string(),
        String::new(),
        "| Attempt | Type | Result | Cost Ratio |".to_string(),
        "|---------|------|--------|------------|".to_string(),
    ];

    for attempt in attempts {
        let result = if attempt.is_successful { "✅" } else { "❌" };
        let cost_ratio = attempt
            .cost_ratio()
            .map(|ratio| format!("{ratio:.2}"))
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!(
            "| {} | {} | {} | {} |",
            attempt.attempt_number, attempt.trial_type, result, cost_ratio
        ));
    }

    lines.join("\n")
}

pub fn format_performance_comparison(comparison: &PerformanceComparison) -> String {
    [
        "## Performance Comparison".to_string(),
        String::new(),
        "| Metric | Original | Optimized | Improvement |".to_string(),
        "|--------|----------|-----------|-------------|".to_string(),
        format!(
            "| Data Size | {} | {} | {:.1}% |",
            format_bytes(comparison.original_total_size),
            format_bytes(comparison.optimized_total_size),
            comparison.size_improvement_ratio * 100.0
        ),
        format!(
            "| Row Count | {} | {} | {:.1}% |",
            format_count(comparison.original_row_count),
            format_count(comparison.optimized_row_count),
            comparison.row_improvement_ratio * 100.0
        ),
        String::new(),
        format!(
            "**Comprehensive Cost Ratio**: {:.2}",
            comparison.comprehensive_cost_ratio
        ),
        format!("**Improvement Level**: {}", comparison.improvement_level),
        format!("**Recommendation**: {}", comparison.recommendation),
    ]
    .join("\n")
}

/// Full report: summary, metrics, slowest nodes, bottlenecks, optimization outcome and actions
pub fn format_optimization_report(
    extracted: &ExtractedMetrics,
    indicators: &[BottleneckIndicator],
    result: Option<&OptimizationResult>,
    generated_at: NaiveDateTime,
) -> String {
    let query_id = if extracted.query.query_id.is_empty() {
        "N/A"
    } else {
        extracted.query.query_id.as_str()
    };

    let mut sections = vec![
        format!(
            "# SQL Optimization Report\n\n**Generated**: {}\n**Query ID**: {}\n\n---",
            generated_at.format("%Y-%m-%d %H:%M:%S"),
            query_id
        ),
        executive_summary(extracted, result),
        metrics_overview(extracted),
        format_top_nodes(extracted),
        format_report(indicators),
    ];
    if let Some(result) = result {
        sections.push(optimization_section(result));
    }
    sections.push(recommendations(indicators));

    let mut report = sections.join("\n\n");
    report.push('\n');
    report
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

fn millis(ms: f64) -> String {
    format_count(ms.max(0.0).round() as u64)
}

fn executive_summary(extracted: &ExtractedMetrics, result: Option<&OptimizationResult>) -> String {
    let query = &extracted.query;
    let headline = match result {
        Some(r) if r.optimization_success => match &r.final_performance {
            Some(perf) if perf.comprehensive_cost_ratio < SIGNIFICANT_THRESHOLD => {
                "🎯 **Significant performance improvement possible**"
            }
            _ => "✅ **Performance improvement opportunities identified**",
        },
        _ => "ℹ️ **Query Analysis Results**",
    };

    let mut lines = vec![
        "## Executive Summary".to_string(),
        String::new(),
        headline.to_string(),
        String::new(),
        format!("- Execution time: {} ms", millis(query.execution_time_ms)),
        format!("- Data size: {:.2} GB", gib(query.total_size_bytes)),
        format!("- Rows processed: {}", format_count(query.row_count)),
    ];
    if query.spill_to_disk_bytes > 0 {
        lines.push(format!(
            "- ⚠️ Disk spill: {:.2} GB",
            gib(query.spill_to_disk_bytes)
        ));
    }
    lines.join("\n")
}

fn metrics_overview(extracted: &ExtractedMetrics) -> String {
    let query = &extracted.query;
    [
        "## Performance Metrics".to_string(),
        String::new(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| Execution Time | {} ms |", millis(query.execution_time_ms)),
        format!("| Data Size | {:.2} GB |", gib(query.total_size_bytes)),
        format!("| Rows Processed | {} |", format_count(query.row_count)),
        format!(
            "| Cache Hit Ratio | {:.1}% |",
            query.cache_hit_ratio * 100.0
        ),
        format!("| Disk Spill | {:.2} GB |", gib(query.spill_to_disk_bytes)),
        format!("| Shuffle Data | {:.2} GB |", gib(query.shuffle_bytes)),
    ]
    .join("\n")
}

fn optimization_section(result: &OptimizationResult) -> String {
    let mut parts = vec![];

    let status = if result.optimization_success {
        format!(
            "✅ Optimization successful (attempt {})",
            result.best_attempt_number
        )
    } else {
        "❌ No improvement from optimization".to_string()
    };
    parts.push(format!("## Optimization Results\n\n{status}"));

    if let Some(performance) = &result.final_performance {
        parts.push(format_performance_comparison(performance));
    }
    if !result.attempts.is_empty() {
        parts.push(format_attempts_summary(&result.attempts));
    }
    parts.push(format!(
        "### Selected Query\n\n```sql\n{}\n```",
        result.best_optimized_query.trim()
    ));

    parts.join("\n\n")
}

fn recommendations(indicators: &[BottleneckIndicator]) -> String {
    let mut lines = vec!["## Recommended Actions".to_string(), String::new()];
    if indicators.is_empty() {
        lines.push("No significant bottlenecks detected at this time.".to_string());
    } else {
        lines.extend(
            indicators
                .iter()
                .take(MAX_RECOMMENDATIONS)
                .enumerate()
                .map(|(i, ind)| format!("{}. **{}**: {}", i + 1, ind.name, ind.recommendation)),
        );
    }
    lines.join("\n")
}

/// `{prefix}_{short id}_{YYYYMMDD_HHMMSS}.{ext}`, the id part only when present
pub fn timestamped_filename(
    prefix: &str,
    extension: &str,
    query_id: &str,
    at: NaiveDateTime,
) -> String {
    let timestamp = at.format("%Y%m%d_%H%M%S");
    let short_id: String = query_id.chars().take(SHORT_ID_LEN).collect();
    if short_id.is_empty() {
        format!("{prefix}_{timestamp}.{extension}")
    } else {
        format!("{prefix}_{short_id}_{timestamp}.{extension}")
    }
}

/// Files written by [`save_artifacts`]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SavedArtifacts {
    pub original_sql: PathBuf,
    /// Only written when the run found an improvement
    pub optimized_sql: Option<PathBuf>,
    pub report: PathBuf,
}

/// Write the original query, the chosen query and the report into `dir`
pub fn save_artifacts(
    dir: &Path,
    result: &OptimizationResult,
    report: &str,
    query_id: &str,
    at: NaiveDateTime,
) -> Result<SavedArtifacts> {
    fs::create_dir_all(dir)
        .map_err(|e| QueryTuneError::io_operation("create", dir.display(), e))?;

    let original_sql = write_file(
        dir,
        &timestamped_filename("original_query", "sql", query_id, at),
        &result.original_query,
    )?;
    let optimized_sql = if result.optimization_success {
        Some(write_file(
            dir,
            &timestamped_filename("optimized_query", "sql", query_id, at),
            &result.best_optimized_query,
        )?)
    } else {
        None
    };
    let report = write_file(
        dir,
        &timestamped_filename("optimization_report", "md", query_id, at),
        report,
    )?;

    Ok(SavedArtifacts {
        original_sql,
        optimized_sql,
        report,
    })
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut body = content.trim_end().to_string();
    body.push('\n');
    fs::write(&path, body).map_err(|e| QueryTuneError::io_operation("write", path.display(), e))?;
    info!(path = %path.display(), "Saved");
    Ok(path)
}
