//! `querytune compare` command

use std::path::Path;

use crate::cli::Cli;
use querytune_core::compare::{compare_performance, PerformanceComparison};
use querytune_core::error::Result;
use querytune_core::format::OutputFormat;
use querytune_core::metrics::load_metrics_file;
use querytune_core::report;

/// Execute the compare command
pub fn execute(cli: &Cli, original: &str, optimized: &str) -> Result<()> {
    let comparison = compare_files(Path::new(original), Path::new(optimized))?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        OutputFormat::Human => {
            println!("{}", report::format_performance_comparison(&comparison));
        }
    }

    Ok(())
}

fn compare_files(original: &Path, optimized: &Path) -> Result<PerformanceComparison> {
    let original_metrics = load_metrics_file(original)?;
    let optimized_metrics = load_metrics_file(optimized)?;
    tracing::debug!(
        original_keys = original_metrics.len(),
        optimized_keys = optimized_metrics.len(),
        "loaded metrics files"
    );
    Ok(compare_performance(&original_metrics, &optimized_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use querytune_core::compare::{ImprovementLevel, Recommendation};
    use querytune_core::error::QueryTuneError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_compare_files() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("original.json");
        let optimized = dir.path().join("optimized.json");
        fs::write(&original, r#"{"total_size_bytes": 1000000, "row_count": 1000}"#).unwrap();
        fs::write(&optimized, r#"{"total_size_bytes": 500000, "row_count": 1000}"#).unwrap();

        let comparison = compare_files(&original, &optimized).unwrap();
        assert!(comparison.is_improved);
        assert_eq!(comparison.recommendation, Recommendation::UseOptimized);
        assert_eq!(comparison.improvement_level, ImprovementLevel::Significant);
    }

    #[test]
    fn test_compare_missing_file() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("original.json");
        fs::write(&original, "{}").unwrap();

        let err = compare_files(&original, &dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, QueryTuneError::NotFound { .. }));
    }
}
