//! Profiler JSON ingestion
//!
//! Two export shapes are recognised: the detailed SQL profiler export (a
//! non-empty `graphs` array of plan graphs with per-node metrics) and the
//! query summary export (`query.metrics` alongside `planMetadatas`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use super::MetricsSnapshot;
use crate::error::{QueryTuneError, Result};

/// Number of slowest nodes kept for reporting
const TOP_NODE_LIMIT: usize = 10;

/// Node name/tag fragments that identify shuffle-producing operators
const SHUFFLE_MARKERS: [&str; 5] = ["shuffle", "exchange", "sort", "aggregate", "repartition"];

/// Shape of a profiler export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFormat {
    SqlProfiler,
    QuerySummary,
    Unknown,
}

/// Metrics for one execution plan node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub execution_time_ms: f64,
    pub rows_produced: u64,
    pub data_size_bytes: u64,
    pub spill_bytes: u64,
    pub peak_memory_bytes: u64,
}

/// Metrics for one shuffle-producing node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShuffleMetrics {
    pub shuffle_id: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub partition_count: u64,
    /// Peak memory of the shuffle sink, 0 when the profile lacks it
    pub peak_memory_bytes: u64,
}

impl ShuffleMetrics {
    pub fn total_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }

    /// Memory per partition (see [`Self::memory_basis`]), when the partition count is known
    pub fn memory_per_partition(&self) -> Option<u64> {
        (self.partition_count > 0).then(|| self.memory_basis() / self.partition_count)
    }

    /// Peak sink memory when known, else the shuffled bytes
    pub fn memory_basis(&self) -> u64 {
        if self.peak_memory_bytes > 0 {
            self.peak_memory_bytes
        } else {
            self.total_bytes()
        }
    }
}

/// Everything extracted from one profiler export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedMetrics {
    pub query: MetricsSnapshot,
    pub nodes: Vec<NodeMetrics>,
    pub shuffles: Vec<ShuffleMetrics>,
    /// Slowest nodes first
    pub top_nodes: Vec<NodeMetrics>,
    /// Summed task time across all executors, 0 when the profile lacks it
    pub task_total_time_ms: f64,
}

/// Map Databricks file-system paths onto the local FUSE mount
pub fn resolve_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("dbfs:/") {
        PathBuf::from(format!("/dbfs/{}", rest))
    } else if path.starts_with("/FileStore/") {
        PathBuf::from(format!("/dbfs{}", path))
    } else {
        PathBuf::from(path)
    }
}

/// Load and parse a profiler JSON file
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_profile(path: &Path) -> Result<Value> {
    let resolved = resolve_path(&path.to_string_lossy());
    if !resolved.exists() {
        return Err(QueryTuneError::not_found("profile", resolved.display()));
    }

    let content = fs::read_to_string(&resolved)
        .map_err(|e| QueryTuneError::io_operation("read profile", resolved.display(), e))?;

    let data: Value =
        serde_json::from_str(&content).map_err(|e| QueryTuneError::InvalidProfile {
            path: resolved.clone(),
            reason: e.to_string(),
        })?;

    tracing::debug!(bytes = content.len(), "loaded profile");
    Ok(data)
}

/// Detect which export shape a profile has
pub fn detect_format(data: &Value) -> ProfileFormat {
    if data
        .get("graphs")
        .and_then(Value::as_array)
        .is_some_and(|graphs| !graphs.is_empty())
    {
        return ProfileFormat::SqlProfiler;
    }

    if data.get("planMetadatas").is_some()
        && data.get("query").and_then(|q| q.get("metrics")).is_some()
    {
        return ProfileFormat::QuerySummary;
    }

    ProfileFormat::Unknown
}

/// Original query text, or an empty string when the profile lacks it
pub fn extract_query_text(data: &Value) -> String {
    match detect_format(data) {
        ProfileFormat::QuerySummary => str_at(data, &["query", "queryText"]),
        ProfileFormat::SqlProfiler => {
            let from_graph = str_at(data, &["graphs", "0", "queryText"]);
            if !from_graph.is_empty() {
                return from_graph;
            }
            data.get("planMetadatas")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .find_map(|m| m.get("queryText").and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        }
        ProfileFormat::Unknown => String::new(),
    }
}

/// Query id, or an empty string when the profile lacks it
pub fn extract_query_id(data: &Value) -> String {
    match detect_format(data) {
        ProfileFormat::QuerySummary => str_at(data, &["query", "id"]),
        ProfileFormat::SqlProfiler => str_at(data, &["graphs", "0", "queryId"]),
        ProfileFormat::Unknown => String::new(),
    }
}

/// Extract query, node and shuffle metrics from a profile
pub fn extract_metrics(data: &Value) -> ExtractedMetrics {
    let format = detect_format(data);
    tracing::debug!(?format, "detected profile format");

    match format {
        ProfileFormat::QuerySummary => extract_from_query_summary(data),
        ProfileFormat::SqlProfiler => extract_from_sql_profiler(data),
        ProfileFormat::Unknown => {
            tracing::warn!("unrecognised profile format, no metrics extracted");
            ExtractedMetrics::default()
        }
    }
}

fn extract_from_query_summary(data: &Value) -> ExtractedMetrics {
    let query = data.get("query").unwrap_or(&Value::Null);
    let metrics = query.get("metrics").unwrap_or(&Value::Null);

    let read_bytes = u64_of(metrics, "readBytes");
    let cache_bytes = u64_of(metrics, "readCacheBytes");
    let cache_hit_ratio = if read_bytes > 0 {
        (cache_bytes as f64 / read_bytes as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let snapshot = MetricsSnapshot {
        query_id: str_at(query, &["id"]),
        status: str_at(query, &["status"]),
        execution_time_ms: f64_of(metrics, "executionTimeMs"),
        total_size_bytes: read_bytes,
        row_count: u64_of(metrics, "rowsReadCount"),
        cache_hit_ratio,
        spill_to_disk_bytes: u64_of(metrics, "spillToDiskBytes"),
        shuffle_bytes: u64_of(metrics, "networkSentBytes"),
        ..Default::default()
    };

    tracing::debug!(
        execution_time_ms = snapshot.execution_time_ms,
        total_size_bytes = snapshot.total_size_bytes,
        row_count = snapshot.row_count,
        "extracted query summary metrics"
    );

    ExtractedMetrics {
        query: snapshot,
        task_total_time_ms: f64_of(metrics, "taskTotalTimeMs"),
        ..Default::default()
    }
}

fn extract_from_sql_profiler(data: &Value) -> ExtractedMetrics {
    let graphs = data
        .get("graphs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut extracted = ExtractedMetrics::default();

    for (graph_index, graph) in graphs.iter().enumerate() {
        if graph_index == 0 {
            extracted.query = query_metrics_from_graph(graph);
            let stats = graph.get("stats").unwrap_or(&Value::Null);
            extracted.task_total_time_ms = f64_of(stats, "taskTotalTimeMs");
        }

        let nodes = graph.get("nodes").and_then(Value::as_array);
        for node in nodes.into_iter().flatten() {
            let Some(node_metrics) = node_metrics(node) else {
                continue;
            };

            if is_shuffle_node(node) {
                if let Some(shuffle) = shuffle_metrics(node, &node_metrics.node_id) {
                    extracted.shuffles.push(shuffle);
                }
            }
            extracted.nodes.push(node_metrics);
        }
    }

    let mut sorted = extracted.nodes.clone();
    sorted.sort_by(|a, b| b.execution_time_ms.total_cmp(&a.execution_time_ms));
    sorted.truncate(TOP_NODE_LIMIT);
    extracted.top_nodes = sorted;

    let shuffle_total: u64 = extracted.shuffles.iter().map(ShuffleMetrics::total_bytes).sum();
    if extracted.query.shuffle_bytes == 0 {
        extracted.query.shuffle_bytes = shuffle_total;
    }

    tracing::debug!(
        nodes = extracted.nodes.len(),
        shuffles = extracted.shuffles.len(),
        "extracted sql profiler metrics"
    );

    extracted
}

fn query_metrics_from_graph(graph: &Value) -> MetricsSnapshot {
    let stats = graph.get("stats").unwrap_or(&Value::Null);
    MetricsSnapshot {
        query_id: str_at(graph, &["queryId"]),
        status: str_at(graph, &["status"]),
        execution_time_ms: f64_of(stats, "durationMs"),
        total_size_bytes: u64_of(stats, "readBytes"),
        row_count: u64_of(stats, "rowsNum"),
        spill_to_disk_bytes: u64_of(stats, "spillToDiskBytes"),
        ..Default::default()
    }
}

fn node_metrics(node: &Value) -> Option<NodeMetrics> {
    let node_id = id_string(node.get("id")?)?;
    let key_metrics = node.get("keyMetrics").unwrap_or(&Value::Null);
    let detailed = node.get("detailedMetrics").unwrap_or(&Value::Null);

    let mut execution_time_ms = f64_of(key_metrics, "durationMs");
    if execution_time_ms == 0.0 {
        execution_time_ms = detailed_value(detailed, "duration");
    }

    let mut rows_produced = u64_of(key_metrics, "rowsNum");
    if rows_produced == 0 {
        rows_produced = non_negative_u64(detailed_value(detailed, "number of output rows"));
    }

    let node_type = ["tag", "nodeType"]
        .iter()
        .find_map(|key| node.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Some(NodeMetrics {
        node_name: node_name(node, &node_id),
        node_id,
        node_type,
        execution_time_ms,
        rows_produced,
        data_size_bytes: u64_of(key_metrics, "dataSize"),
        spill_bytes: u64_of(key_metrics, "spillToDisk"),
        peak_memory_bytes: peak_memory(key_metrics),
    })
}

/// Most meaningful display name for a node
fn node_name(node: &Value, node_id: &str) -> String {
    ["name", "nodeName", "tag", "nodeType"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node-{}", node_id))
}

fn is_shuffle_node(node: &Value) -> bool {
    let name = node_name(node, "").to_lowercase();
    let tag = str_at(node, &["tag"]).to_lowercase();
    SHUFFLE_MARKERS
        .iter()
        .any(|marker| name.contains(marker) || tag.contains(marker))
}

fn shuffle_metrics(node: &Value, node_id: &str) -> Option<ShuffleMetrics> {
    let key_metrics = node.get("keyMetrics").unwrap_or(&Value::Null);
    let detailed = node.get("detailedMetrics").unwrap_or(&Value::Null);

    let mut read_bytes = u64_of(key_metrics, "shuffleReadBytes");
    if read_bytes == 0 {
        read_bytes = non_negative_u64(detailed_value(detailed, "shuffle bytes read"));
    }
    let mut write_bytes = u64_of(key_metrics, "shuffleWriteBytes");
    if write_bytes == 0 {
        write_bytes = non_negative_u64(detailed_value(detailed, "shuffle bytes written"));
    }

    if read_bytes == 0 && write_bytes == 0 {
        return None;
    }

    Some(ShuffleMetrics {
        shuffle_id: node_id.to_string(),
        read_bytes,
        write_bytes,
        partition_count: u64_of(key_metrics, "numPartitions"),
        peak_memory_bytes: peak_memory(key_metrics),
    })
}

fn peak_memory(key_metrics: &Value) -> u64 {
    match u64_of(key_metrics, "peakMemoryBytes") {
        0 => u64_of(key_metrics, "peak_memory_bytes"),
        bytes => bytes,
    }
}

/// `detailedMetrics` entries are objects carrying a `value` field
fn detailed_value(detailed: &Value, name: &str) -> f64 {
    detailed
        .get(name)
        .map(|entry| f64_of(entry, "value"))
        .unwrap_or(0.0)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Walk object keys (or array indices) and return the string found, if any
fn str_at(data: &Value, path: &[&str]) -> String {
    let mut current = data;
    for segment in path {
        current = match current {
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(item) => item,
                None => return String::new(),
            },
            _ => match current.get(*segment) {
                Some(next) => next,
                None => return String::new(),
            },
        };
    }
    current.as_str().unwrap_or_default().to_string()
}

fn f64_of(data: &Value, key: &str) -> f64 {
    data.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

fn u64_of(data: &Value, key: &str) -> u64 {
    non_negative_u64(f64_of(data, key))
}

fn non_negative_u64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
