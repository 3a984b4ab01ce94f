//! Slowest-node ranking for the optimization report

use std::fmt;

use serde::Serialize;

use crate::format::format_count;
use crate::metrics::{ExtractedMetrics, NodeMetrics};

const MIB: f64 = 1024.0 * 1024.0;

/// Node names longer than this are cut in the ranking table
const NODE_NAME_LEN: usize = 100;

/// Headroom applied to the slowest node when the profile has no total time
const ESTIMATED_TOTAL_FACTOR: f64 = 1.2;

/// Per-node severity, by wall time alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl NodeSeverity {
    pub fn from_duration(duration_ms: f64) -> Self {
        if duration_ms >= 10_000.0 {
            NodeSeverity::Critical
        } else if duration_ms >= 5_000.0 {
            NodeSeverity::High
        } else if duration_ms >= 1_000.0 {
            NodeSeverity::Medium
        } else {
            NodeSeverity::Low
        }
    }

    fn icon(self) -> &'static str {
        match self {
            NodeSeverity::Critical => "🔴",
            NodeSeverity::High => "🟠",
            NodeSeverity::Medium => "🟡",
            NodeSeverity::Low => "🟢",
        }
    }
}

impl fmt::Display for NodeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSeverity::Critical => write!(f, "CRITICAL"),
            NodeSeverity::High => write!(f, "HIGH"),
            NodeSeverity::Medium => write!(f, "MEDIUM"),
            NodeSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Where the total time that percentages are taken against came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// Summed executor task time
    TaskTotalTime,
    /// Query wall time
    ExecutionTime,
    /// Slowest node plus 20%
    Estimated,
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBasis::TaskTotalTime => write!(f, "cumulative task time"),
            TimeBasis::ExecutionTime => write!(f, "query execution time"),
            TimeBasis::Estimated => write!(f, "estimated from slowest node"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedNode {
    pub rank: usize,
    pub node_id: String,
    pub node_name: String,
    pub duration_ms: f64,
    /// Share of the total time, capped at 100
    pub time_percentage: f64,
    pub rows_processed: u64,
    pub peak_memory_mb: f64,
    /// 0 when the node reports no duration
    pub rows_per_sec: f64,
    pub severity: NodeSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopNodeRanking {
    pub total_time_ms: f64,
    pub basis: TimeBasis,
    /// Summed duration of the ranked nodes
    pub ranked_time_ms: f64,
    pub nodes: Vec<RankedNode>,
}

/// Total time for percentage calculations, with the basis it was taken from
pub fn total_time(extracted: &ExtractedMetrics) -> (f64, TimeBasis) {
    if extracted.task_total_time_ms > 0.0 {
        return (extracted.task_total_time_ms, TimeBasis::TaskTotalTime);
    }
    if extracted.query.execution_time_ms > 0.0 {
        return (extracted.query.execution_time_ms, TimeBasis::ExecutionTime);
    }

    let slowest = extracted
        .nodes
        .iter()
        .map(|node| node.execution_time_ms)
        .fold(0.0_f64, f64::max);
    let slowest = if slowest > 0.0 { slowest } else { 1.0 };
    ((slowest * ESTIMATED_TOTAL_FACTOR).round(), TimeBasis::Estimated)
}

/// Rank the slowest nodes already selected during extraction
pub fn rank_top_nodes(extracted: &ExtractedMetrics) -> TopNodeRanking {
    let (total_time_ms, basis) = total_time(extracted);

    let nodes: Vec<RankedNode> = extracted
        .top_nodes
        .iter()
        .enumerate()
        .map(|(i, node)| rank_node(i + 1, node, total_time_ms))
        .collect();

    TopNodeRanking {
        total_time_ms,
        basis,
        ranked_time_ms: nodes.iter().map(|node| node.duration_ms).sum(),
        nodes,
    }
}

fn rank_node(rank: usize, node: &NodeMetrics, total_time_ms: f64) -> RankedNode {
    let duration_ms = node.execution_time_ms.max(0.0);
    let rows_per_sec = if duration_ms > 0.0 {
        node.rows_produced as f64 * 1000.0 / duration_ms
    } else {
        0.0
    };

    RankedNode {
        rank,
        node_id: node.node_id.clone(),
        node_name: node.node_name.clone(),
        duration_ms,
        time_percentage: (duration_ms / total_time_ms.max(1.0) * 100.0).min(100.0),
        rows_processed: node.rows_produced,
        peak_memory_mb: node.peak_memory_bytes as f64 / MIB,
        rows_per_sec,
        severity: NodeSeverity::from_duration(duration_ms),
    }
}

fn memory_icon(peak_memory_mb: f64) -> &'static str {
    if peak_memory_mb < 100.0 {
        "💚"
    } else if peak_memory_mb < 1000.0 {
        "⚠️"
    } else {
        "🚨"
    }
}

fn display_name(node: &RankedNode) -> String {
    let name = if node.node_name.is_empty() {
        node.node_id.as_str()
    } else {
        node.node_name.as_str()
    };
    let mut shown: String = name.chars().take(NODE_NAME_LEN).collect();
    if name.chars().count() > NODE_NAME_LEN {
        shown.push_str("...");
    }
    shown.replace('|', "\\|")
}

fn millis(ms: f64) -> String {
    format_count(ms.max(0.0).round() as u64)
}

/// Markdown table of the slowest nodes
pub fn format_top_nodes(extracted: &ExtractedMetrics) -> String {
    let ranking = rank_top_nodes(extracted);
    if ranking.nodes.is_empty() {
        return "## Slowest Nodes\n\nNo node metrics found in the profile.".to_string();
    }

    let mut lines = vec![
        format!("## Top {} Slowest Nodes", ranking.nodes.len()),
        String::new(),
    ];

    lines.push(format!(
        "- Total time: {} ms ({:.1} h, {})",
        millis(ranking.total_time_ms),
        ranking.total_time_ms / 3_600_000.0,
        ranking.basis
    ));
    lines.push(format!(
        "- Top {} combined: {} ms",
        ranking.nodes.len(),
        millis(ranking.ranked_time_ms)
    ));
    lines.push(String::new());
    lines.push(
        "| # | Node | ID | Time (ms) | % of Total | Rows | Peak Memory | Rows/sec | Severity |"
            .to_string(),
    );
    lines.push(
        "|---|------|----|-----------|------------|------|-------------|----------|----------|"
            .to_string(),
    );

    for node in &ranking.nodes {
        let rows_per_sec = if node.rows_per_sec > 0.0 {
            format_count(node.rows_per_sec.round() as u64)
        } else {
            "-".to_string()
        };
        lines.push(format!(
            "| {} | {}{} {} | {} | {} | {:.1}% | {} | {:.1} MB | {} | {} |",
            node.rank,
            node.severity.icon(),
            memory_icon(node.peak_memory_mb),
            display_name(node),
            node.node_id,
            millis(node.duration_ms),
            node.time_percentage,
            format_count(node.rows_processed),
            node.peak_memory_mb,
            rows_per_sec,
            node.severity
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSnapshot;

    fn node(id: &str, name: &str, ms: f64, rows: u64, peak_bytes: u64) -> NodeMetrics {
        NodeMetrics {
            node_id: id.to_string(),
            node_name: name.to_string(),
            execution_time_ms: ms,
            rows_produced: rows,
            peak_memory_bytes: peak_bytes,
            ..Default::default()
        }
    }

    fn extracted(nodes: Vec<NodeMetrics>) -> ExtractedMetrics {
        ExtractedMetrics {
            top_nodes: nodes.clone(),
            nodes,
            ..Default::default()
        }
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(NodeSeverity::from_duration(10_000.0), NodeSeverity::Critical);
        assert_eq!(NodeSeverity::from_duration(9_999.0), NodeSeverity::High);
        assert_eq!(NodeSeverity::from_duration(5_000.0), NodeSeverity::High);
        assert_eq!(NodeSeverity::from_duration(1_000.0), NodeSeverity::Medium);
        assert_eq!(NodeSeverity::from_duration(999.0), NodeSeverity::Low);
        assert_eq!(NodeSeverity::from_duration(0.0), NodeSeverity::Low);
    }

    #[test]
    fn test_total_time_basis_fallbacks() {
        let mut metrics = extracted(vec![node("1", "Scan", 5_000.0, 0, 0)]);
        assert_eq!(total_time(&metrics), (6_000.0, TimeBasis::Estimated));

        metrics.query = MetricsSnapshot {
            execution_time_ms: 8_000.0,
            ..Default::default()
        };
        assert_eq!(total_time(&metrics), (8_000.0, TimeBasis::ExecutionTime));

        metrics.task_total_time_ms = 40_000.0;
        assert_eq!(total_time(&metrics), (40_000.0, TimeBasis::TaskTotalTime));

        assert_eq!(
            total_time(&ExtractedMetrics::default()),
            (1.0, TimeBasis::Estimated)
        );
    }

    #[test]
    fn test_rank_top_nodes() {
        let mut metrics = extracted(vec![
            node("4", "Photon Shuffle Exchange Sink", 12_000.0, 3_000_000, 2 * 1024 * 1024 * 1024),
            node("2", "Scan sales", 2_000.0, 1_000_000, 50 * 1024 * 1024),
            node("9", "Filter", 0.0, 10, 0),
        ]);
        metrics.task_total_time_ms = 20_000.0;

        let ranking = rank_top_nodes(&metrics);
        assert_eq!(ranking.basis, TimeBasis::TaskTotalTime);
        assert_eq!(ranking.ranked_time_ms, 14_000.0);
        assert_eq!(ranking.nodes.len(), 3);

        let first = &ranking.nodes[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.severity, NodeSeverity::Critical);
        assert!((first.time_percentage - 60.0).abs() < 1e-9);
        assert_eq!(first.rows_per_sec, 250_000.0);
        assert_eq!(first.peak_memory_mb, 2048.0);

        let second = &ranking.nodes[1];
        assert_eq!(second.severity, NodeSeverity::Medium);
        assert!((second.time_percentage - 10.0).abs() < 1e-9);
        assert_eq!(second.rows_per_sec, 500_000.0);

        let idle = &ranking.nodes[2];
        assert_eq!(idle.rank, 3);
        assert_eq!(idle.rows_per_sec, 0.0);
        assert_eq!(idle.severity, NodeSeverity::Low);
    }

    #[test]
    fn test_percentage_capped_at_100() {
        let mut metrics = extracted(vec![node("1", "Sort", 30_000.0, 0, 0)]);
        metrics.query.execution_time_ms = 10_000.0;

        let ranking = rank_top_nodes(&metrics);
        assert_eq!(ranking.nodes[0].time_percentage, 100.0);
    }

    #[test]
    fn test_format_top_nodes_table() {
        let mut metrics = extracted(vec![
            node("4", "Shuffle | Exchange", 12_000.0, 3_000_000, 2 * 1024 * 1024 * 1024),
            node("7", "", 500.0, 0, 0),
        ]);
        metrics.task_total_time_ms = 20_000.0;

        let table = format_top_nodes(&metrics);
        assert!(table.starts_with("## Top 2 Slowest Nodes"));
        assert!(table.contains("- Total time: 20,000 ms (0.0 h, cumulative task time)"));
        assert!(table.contains("- Top 2 combined: 12,500 ms"));
        assert!(table.contains(
            "| 1 | 🔴🚨 Shuffle \\| Exchange | 4 | 12,000 | 60.0% | 3,000,000 | 2048.0 MB | 250,000 | CRITICAL |"
        ));
        assert!(table.contains("| 2 | 🟢💚 7 | 7 | 500 | 2.5% | 0 | 0.0 MB | - | LOW |"));
    }

    #[test]
    fn test_format_top_nodes_truncates_long_names() {
        let long_name = "x".repeat(150);
        let table = format_top_nodes(&extracted(vec![node("1", &long_name, 10.0, 0, 0)]));
        assert!(table.contains(&format!("{}... |", "x".repeat(100))));
        assert!(!table.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_format_top_nodes_without_nodes() {
        let table = format_top_nodes(&ExtractedMetrics::default());
        assert!(table.contains("No node metrics found"));
        assert!(!table.contains("| # |"));
    }
}
