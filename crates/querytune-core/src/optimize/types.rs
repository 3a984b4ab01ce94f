use std::fmt;

use serde::Serialize;

use crate::compare::PerformanceComparison;
use crate::metrics::MetricsMap;

/// Why an attempt was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialType {
    Initial,
    SingleOptimization,
    /// Reserved tag; the controller never selects it
    PerformanceImprovement,
    ErrorCorrection,
}

impl TrialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::Initial => "initial",
            TrialType::SingleOptimization => "single_optimization",
            TrialType::PerformanceImprovement => "performance_improvement",
            TrialType::ErrorCorrection => "error_correction",
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One round of the optimization loop. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationAttempt {
    /// 1-based, equal to the attempt's position in the ledger plus one
    pub attempt_number: u32,
    pub trial_type: TrialType,
    /// Candidate SQL; empty when generation itself failed
    pub query: String,
    pub explain_result: String,
    #[serde(skip_serializing_if = "MetricsMap::is_empty")]
    pub optimized_metrics: MetricsMap,
    pub performance: Option<PerformanceComparison>,
    pub error_info: Option<String>,
    pub is_successful: bool,
}

impl OptimizationAttempt {
    pub fn cost_ratio(&self) -> Option<f64> {
        self.performance
            .as_ref()
            .map(|p| p.comprehensive_cost_ratio)
    }
}

/// Terminal artifact of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub original_query: String,
    /// The best candidate, or the original query when nothing succeeded
    pub best_optimized_query: String,
    /// 0 when no attempt succeeded
    pub best_attempt_number: u32,
    pub attempts: Vec<OptimizationAttempt>,
    pub final_performance: Option<PerformanceComparison>,
    pub optimization_success: bool,
}

impl OptimizationResult {
    pub fn best_attempt(&self) -> Option<&OptimizationAttempt> {
        if self.best_attempt_number == 0 {
            return None;
        }
        self.attempts
            .iter()
            .find(|a| a.attempt_number == self.best_attempt_number)
    }
}
