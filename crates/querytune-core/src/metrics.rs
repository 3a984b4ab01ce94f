//! Query metrics: the typed nested map consumed by the comparator, and the
//! per-query snapshot produced by profile ingestion.

pub mod profile;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryTuneError, Result};

pub use profile::{ExtractedMetrics, NodeMetrics, ProfileFormat, ShuffleMetrics};

/// A metric leaf or a nested group of metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Map(MetricsMap),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&MetricsMap> {
        match self {
            MetricValue::Map(m) => Some(m),
            MetricValue::Number(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<MetricsMap> for MetricValue {
    fn from(value: MetricsMap) -> Self {
        MetricValue::Map(value)
    }
}

/// String-keyed numeric map with optional nesting.
///
/// Built from arbitrary JSON: numbers and objects are kept, every other JSON
/// type is dropped so that it reads as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct MetricsMap(BTreeMap<String, MetricValue>);

impl MetricsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricValue)> {
        self.0.iter()
    }

    /// Resolve a dotted path (`scan_operations.total_size`) through nested maps
    pub fn lookup(&self, dotted_key: &str) -> Option<&MetricValue> {
        let mut segments = dotted_key.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Numeric value at a dotted path, or `default` when any segment is
    /// absent or the terminal value is not a number. Never panics.
    pub fn safe_get(&self, dotted_key: &str, default: f64) -> f64 {
        self.lookup(dotted_key)
            .and_then(MetricValue::as_number)
            .unwrap_or(default)
    }

    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        let entries = object
            .iter()
            .filter_map(|(key, value)| convert_json(value).map(|v| (key.clone(), v)))
            .collect();
        MetricsMap(entries)
    }
}

fn convert_json(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Number(n) => n.as_f64().map(MetricValue::Number),
        Value::Object(object) => Some(MetricValue::Map(MetricsMap::from_object(object))),
        _ => None,
    }
}

impl From<Value> for MetricsMap {
    fn from(value: Value) -> Self {
        match &value {
            Value::Object(object) => MetricsMap::from_object(object),
            _ => MetricsMap::default(),
        }
    }
}

impl From<&Value> for MetricsMap {
    fn from(value: &Value) -> Self {
        match value {
            Value::Object(object) => MetricsMap::from_object(object),
            _ => MetricsMap::default(),
        }
    }
}

/// Scan breakdown of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOperations {
    #[serde(default)]
    pub total_size: u64,
}

/// Join breakdown of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinOperations {
    #[serde(default)]
    pub total_cost: f64,
}

/// Immutable performance snapshot of one query execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub query_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,

    #[serde(default)]
    pub execution_time_ms: f64,

    #[serde(default)]
    pub total_size_bytes: u64,

    #[serde(default)]
    pub row_count: u64,

    /// Fraction of bytes served from cache, in [0, 1]
    #[serde(default)]
    pub cache_hit_ratio: f64,

    #[serde(default)]
    pub spill_to_disk_bytes: u64,

    #[serde(default)]
    pub shuffle_bytes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_operations: Option<ScanOperations>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_operations: Option<JoinOperations>,
}

impl MetricsSnapshot {
    /// Flatten into the map shape the comparator reads.
    ///
    /// Breakdowns are emitted only when present so that a snapshot without
    /// them never contributes scan/join components to the cost ratio.
    pub fn to_metrics_map(&self) -> MetricsMap {
        let mut map = MetricsMap::new()
            .with("total_size_bytes", self.total_size_bytes)
            .with("row_count", self.row_count)
            .with("execution_time_ms", self.execution_time_ms)
            .with("spill_to_disk_bytes", self.spill_to_disk_bytes)
            .with("shuffle_bytes", self.shuffle_bytes)
            .with("cache_hit_ratio", self.cache_hit_ratio);

        if let Some(scan) = self.scan_operations {
            map.insert(
                "scan_operations",
                MetricsMap::new().with("total_size", scan.total_size),
            );
        }
        if let Some(join) = self.join_operations {
            map.insert(
                "join_operations",
                MetricsMap::new().with("total_cost", join.total_cost),
            );
        }

        map
    }
}

/// Load a metrics map from a JSON file.
///
/// A profiler export contributes its query-level metrics; any other JSON
/// object is read as a metrics map directly.
pub fn load_metrics_file(path: &Path) -> Result<MetricsMap> {
    let data = profile::load_profile(path).map_err(|e| match e {
        QueryTuneError::InvalidProfile { path, reason } => {
            QueryTuneError::InvalidMetrics { path, reason }
        }
        QueryTuneError::NotFound { value, .. } => QueryTuneError::not_found("metrics file", value),
        other => other,
    })?;

    if !data.is_object() {
        return Err(QueryTuneError::InvalidMetrics {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        });
    }

    if profile::detect_format(&data) != ProfileFormat::Unknown {
        return Ok(profile::extract_metrics(&data).query.to_metrics_map());
    }
    Ok(MetricsMap::from(data))
}
