//! Bottleneck detection over extracted profile metrics
//!
//! Produces severity-tagged indicators and the markdown report handed to the
//! rewrite prompts as opaque context.

use std::fmt;

use serde::Serialize;

use crate::config::BottleneckConfig;
use crate::metrics::{ExtractedMetrics, NodeMetrics, ShuffleMetrics};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Number of slowest nodes inspected for the slow-node check
const SLOW_NODE_CANDIDATES: usize = 3;

/// Indicator severity, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

/// One detected performance problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckIndicator {
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub affected_nodes: Vec<String>,
    pub recommendation: String,
}

/// Run every check and collect the indicators in check order
pub fn analyze(metrics: &ExtractedMetrics, config: &BottleneckConfig) -> Vec<BottleneckIndicator> {
    let mut indicators = Vec::new();

    indicators.extend(check_spill(metrics));
    indicators.extend(check_cache(metrics));
    indicators.extend(check_shuffles(metrics, config));
    indicators.extend(check_data_skew(metrics));
    indicators.extend(check_slow_nodes(metrics));

    tracing::debug!(count = indicators.len(), "bottleneck analysis complete");
    indicators
}

fn check_spill(metrics: &ExtractedMetrics) -> Option<BottleneckIndicator> {
    let spill_bytes = metrics.query.spill_to_disk_bytes;
    if spill_bytes == 0 {
        return None;
    }

    let spill_gb = spill_bytes as f64 / GIB;
    let severity = if spill_gb > 10.0 {
        Severity::High
    } else if spill_gb > 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    Some(BottleneckIndicator {
        name: "Memory Spill".to_string(),
        severity,
        description: format!("Spill to disk detected: {:.2} GB", spill_gb),
        affected_nodes: Vec::new(),
        recommendation: "Consider adjusting spark.sql.adaptive.advisoryPartitionSizeInBytes \
                         or increasing cluster memory"
            .to_string(),
    })
}

fn check_cache(metrics: &ExtractedMetrics) -> Option<BottleneckIndicator> {
    let ratio = metrics.query.cache_hit_ratio;
    if ratio >= 0.8 {
        return None;
    }

    let severity = if ratio < 0.3 {
        Severity::High
    } else if ratio < 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    };

    Some(BottleneckIndicator {
        name: "Cache Inefficiency".to_string(),
        severity,
        description: format!("Cache hit ratio is low: {:.1}%", ratio * 100.0),
        affected_nodes: Vec::new(),
        recommendation: "Review Delta Lake cache settings and optimize caching for \
                         frequently accessed data"
            .to_string(),
    })
}

fn check_shuffles(metrics: &ExtractedMetrics, config: &BottleneckConfig) -> Vec<BottleneckIndicator> {
    let mut indicators = Vec::new();
    let partition_threshold = config.memory_per_partition_threshold_bytes();

    for shuffle in &metrics.shuffles {
        let shuffle_gb = shuffle.total_bytes() as f64 / GIB;
        if shuffle_gb < 1.0 {
            continue;
        }

        let severity = if shuffle_gb > 100.0 {
            Severity::High
        } else if shuffle_gb > 10.0 {
            Severity::Medium
        } else {
            Severity::Low
        };

        indicators.push(BottleneckIndicator {
            name: "Shuffle Bottleneck".to_string(),
            severity,
            description: format!("Large shuffle detected: {:.2} GB", shuffle_gb),
            affected_nodes: vec![shuffle.shuffle_id.clone()],
            recommendation: "Consider optimizing JOIN keys, adding BROADCAST hints, \
                             or reviewing partition strategy"
                .to_string(),
        });

        if let (Some(per_partition), Some(partitions)) = (
            shuffle.memory_per_partition(),
            repartition_count(shuffle, partition_threshold),
        ) {
            indicators.push(BottleneckIndicator {
                name: "Partition Skew".to_string(),
                severity: Severity::High,
                description: format!(
                    "High memory per partition: {:.0} MB across {} partitions",
                    per_partition as f64 / MIB,
                    shuffle.partition_count
                ),
                affected_nodes: vec![shuffle.shuffle_id.clone()],
                recommendation: format!(
                    "Consider REPARTITION({}) to keep each partition under {} MB, \
                     or salting to reduce skew",
                    partitions,
                    config.memory_per_partition_threshold_mb
                ),
            });
        }
    }

    indicators
}

/// Partition count that brings a shuffle's per-partition memory under
/// `threshold_bytes`, or `None` when it is already under the threshold.
pub fn repartition_count(shuffle: &ShuffleMetrics, threshold_bytes: u64) -> Option<u64> {
    let per_partition = shuffle.memory_per_partition()?;
    if threshold_bytes == 0 || per_partition <= threshold_bytes {
        return None;
    }
    let required = (shuffle.memory_basis() as f64 / threshold_bytes as f64).round() as u64;
    Some(required.max(shuffle.partition_count + 1))
}

fn check_data_skew(metrics: &ExtractedMetrics) -> Option<BottleneckIndicator> {
    if metrics.nodes.len() < 2 {
        return None;
    }

    let times: Vec<f64> = metrics
        .nodes
        .iter()
        .map(|n| n.execution_time_ms)
        .filter(|t| *t > 0.0)
        .collect();
    if times.is_empty() {
        return None;
    }

    let avg = times.iter().sum::<f64>() / times.len() as f64;
    let max = times.iter().copied().fold(f64::MIN, f64::max);
    if avg <= 0.0 {
        return None;
    }

    let skew_ratio = max / avg;
    if skew_ratio < 3.0 {
        return None;
    }

    let severity = if skew_ratio > 10.0 {
        Severity::High
    } else if skew_ratio > 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    let slowest = metrics
        .nodes
        .iter()
        .max_by(|a, b| a.execution_time_ms.total_cmp(&b.execution_time_ms))?;

    Some(BottleneckIndicator {
        name: "Data Skew".to_string(),
        severity,
        description: format!(
            "Execution time skew detected (skew ratio: {:.1}x)",
            skew_ratio
        ),
        affected_nodes: vec![slowest.node_id.clone()],
        recommendation: "Review JOIN key distribution, apply salting, or \
                         leverage Adaptive Query Execution"
            .to_string(),
    })
}

fn check_slow_nodes(metrics: &ExtractedMetrics) -> Vec<BottleneckIndicator> {
    let total_time = metrics.query.execution_time_ms;
    if total_time <= 0.0 {
        return Vec::new();
    }

    metrics
        .top_nodes
        .iter()
        .take(SLOW_NODE_CANDIDATES)
        .filter_map(|node| {
            let share = node.execution_time_ms / total_time;
            if share < 0.3 {
                return None;
            }

            let severity = if share > 0.7 {
                Severity::High
            } else if share > 0.5 {
                Severity::Medium
            } else {
                Severity::Low
            };

            Some(BottleneckIndicator {
                name: "High-Load Node".to_string(),
                severity,
                description: format!(
                    "Node '{}' consumes {:.1}% of total time",
                    node.node_name,
                    share * 100.0
                ),
                affected_nodes: vec![node.node_id.clone()],
                recommendation: node_recommendation(node).to_string(),
            })
        })
        .collect()
}

fn node_recommendation(node: &NodeMetrics) -> &'static str {
    let node_type = node.node_type.to_lowercase();
    let name = node.node_name.to_lowercase();
    let mentions = |needle: &str| node_type.contains(needle) || name.contains(needle);

    if mentions("scan") {
        "Consider partition pruning, Z-ORDER, or Liquid Clustering"
    } else if mentions("join") {
        "Consider BROADCAST hints, JOIN order optimization, or reviewing JOIN conditions"
    } else if node_type.contains("aggregate") || name.contains("agg") {
        "Consider partial aggregation or stronger pre-aggregation filtering"
    } else if mentions("sort") {
        "Consider indexing sort columns or removing unnecessary sorts"
    } else {
        "Review node processing logic for optimization opportunities"
    }
}

/// Render indicators as a markdown report grouped by severity
pub fn format_report(indicators: &[BottleneckIndicator]) -> String {
    if indicators.is_empty() {
        return "## Bottleneck Analysis\n\nNo significant bottlenecks detected.".to_string();
    }

    let mut lines = vec![
        "## Bottleneck Analysis".to_string(),
        String::new(),
        format!("**Issues detected: {}**", indicators.len()),
    ];

    for severity in [Severity::High, Severity::Medium, Severity::Low] {
        let group: Vec<&BottleneckIndicator> =
            indicators.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }

        lines.push(String::new());
        lines.push(format!("### {}", severity));
        lines.push(String::new());

        for indicator in group {
            lines.push(format!("#### {}", indicator.name));
            lines.push(format!("- {}", indicator.description));
            if !indicator.affected_nodes.is_empty() {
                lines.push(format!(
                    "- Affected nodes: {}",
                    indicator.affected_nodes.join(", ")
                ));
            }
            lines.push(format!("- Recommendation: {}", indicator.recommendation));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
