//! Performance comparison between an original and a rewritten query
//!
//! `compare_performance` is pure: no clock, no I/O, no randomness. Missing,
//! negative or non-finite metrics read as 0, and a component whose original
//! value is 0 is left out of the weighted cost ratio.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::{MetricValue, MetricsMap};

/// Either size or row ratio below this marks the candidate as improved
pub const IMPROVEMENT_THRESHOLD: f64 = 0.95;

/// Cost ratios below this are a significant improvement
pub const SIGNIFICANT_THRESHOLD: f64 = 0.9;

/// Cost ratios below this (and at or above SIGNIFICANT) are a moderate improvement
pub const MODERATE_THRESHOLD: f64 = 1.0;

/// Cost ratios above this are a degradation
pub const DEGRADED_THRESHOLD: f64 = 1.1;

const SIZE_WEIGHT: f64 = 0.3;
const ROW_WEIGHT: f64 = 0.2;
const SCAN_WEIGHT: f64 = 0.2;
const JOIN_WEIGHT: f64 = 0.3;

/// Which query the comparison recommends running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    UseOptimized,
    UseOriginal,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::UseOptimized => write!(f, "Use optimized query"),
            Recommendation::UseOriginal => write!(f, "Use original query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImprovementLevel {
    Significant,
    Moderate,
    Degraded,
    Neutral,
}

impl fmt::Display for ImprovementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImprovementLevel::Significant => write!(f, "SIGNIFICANT"),
            ImprovementLevel::Moderate => write!(f, "MODERATE"),
            ImprovementLevel::Degraded => write!(f, "DEGRADED"),
            ImprovementLevel::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Result of comparing one candidate against the original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceComparison {
    pub original_total_size: u64,
    pub optimized_total_size: u64,
    pub original_row_count: u64,
    pub optimized_row_count: u64,
    /// optimized / original bytes (1.0 when the original is 0)
    pub size_ratio: f64,
    /// optimized / original rows (1.0 when the original is 0)
    pub row_ratio: f64,
    /// Fractional byte reduction, `1 - size_ratio`
    pub size_improvement_ratio: f64,
    /// Fractional row reduction, `1 - row_ratio`
    pub row_improvement_ratio: f64,
    /// Weighted mean of the qualifying component ratios; lower is better
    pub comprehensive_cost_ratio: f64,
    pub recommendation: Recommendation,
    pub improvement_level: ImprovementLevel,
    pub is_improved: bool,
}

/// `numerator / denominator`, or 1.0 (neutral) when the denominator is not positive
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

/// Classify a cost ratio.
///
/// `(1.0, 1.1]` is deliberately NEUTRAL / use-original.
pub fn classify(cost_ratio: f64) -> (Recommendation, ImprovementLevel) {
    if cost_ratio < SIGNIFICANT_THRESHOLD {
        (Recommendation::UseOptimized, ImprovementLevel::Significant)
    } else if cost_ratio < MODERATE_THRESHOLD {
        (Recommendation::UseOptimized, ImprovementLevel::Moderate)
    } else if cost_ratio > DEGRADED_THRESHOLD {
        (Recommendation::UseOriginal, ImprovementLevel::Degraded)
    } else {
        (Recommendation::UseOriginal, ImprovementLevel::Neutral)
    }
}

/// Compare two metrics maps. Never panics; empty input yields a neutral result.
pub fn compare_performance(original: &MetricsMap, optimized: &MetricsMap) -> PerformanceComparison {
    let original_size = metric(original, "total_size_bytes");
    let optimized_size = metric(optimized, "total_size_bytes");
    let original_rows = metric(original, "row_count");
    let optimized_rows = metric(optimized, "row_count");

    let size_ratio = safe_ratio(optimized_size, original_size);
    let row_ratio = safe_ratio(optimized_rows, original_rows);
    let is_improved = size_ratio < IMPROVEMENT_THRESHOLD || row_ratio < IMPROVEMENT_THRESHOLD;

    let cost_ratio = comprehensive_cost_ratio(original, optimized);
    let (recommendation, improvement_level) = classify(cost_ratio);

    PerformanceComparison {
        original_total_size: original_size as u64,
        optimized_total_size: optimized_size as u64,
        original_row_count: original_rows as u64,
        optimized_row_count: optimized_rows as u64,
        size_ratio,
        row_ratio,
        size_improvement_ratio: 1.0 - size_ratio,
        row_improvement_ratio: 1.0 - row_ratio,
        comprehensive_cost_ratio: cost_ratio,
        recommendation,
        improvement_level,
        is_improved,
    }
}

/// Weighted mean of the size, row, scan and join ratios.
///
/// A component is included only when its original value is positive; with
/// no qualifying component the ratio is 1.0.
pub fn comprehensive_cost_ratio(original: &MetricsMap, optimized: &MetricsMap) -> f64 {
    let components = [
        (
            metric(original, "total_size_bytes"),
            metric(optimized, "total_size_bytes"),
            SIZE_WEIGHT,
        ),
        (
            metric(original, "row_count"),
            metric(optimized, "row_count"),
            ROW_WEIGHT,
        ),
        (
            breakdown(original, "scan_operations", "total_size"),
            breakdown(optimized, "scan_operations", "total_size"),
            SCAN_WEIGHT,
        ),
        (
            breakdown(original, "join_operations", "total_cost"),
            breakdown(optimized, "join_operations", "total_cost"),
            JOIN_WEIGHT,
        ),
    ];

    let (weighted_sum, total_weight) = components
        .iter()
        .filter(|(orig, _, _)| *orig > 0.0)
        .fold((0.0, 0.0), |(sum, weights), (orig, opt, weight)| {
            (sum + safe_ratio(*opt, *orig) * weight, weights + weight)
        });

    if total_weight <= 0.0 {
        return 1.0;
    }
    weighted_sum / total_weight
}

fn metric(map: &MetricsMap, key: &str) -> f64 {
    non_negative(map.safe_get(key, 0.0))
}

/// A breakdown is either a raw number or a map carrying `field`
fn breakdown(map: &MetricsMap, key: &str, field: &str) -> f64 {
    match map.lookup(key) {
        Some(MetricValue::Number(n)) => non_negative(*n),
        Some(MetricValue::Map(inner)) => non_negative(inner.safe_get(field, 0.0)),
        None => 0.0,
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}


#[cfg(test)]
mod property;
