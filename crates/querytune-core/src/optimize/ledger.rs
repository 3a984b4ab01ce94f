//! Append-only record of attempts

use super::types::{OptimizationAttempt, TrialType};
use crate::compare::PerformanceComparison;
use crate::metrics::MetricsMap;

/// Everything about an attempt except its number and trial type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptOutcome {
    pub query: String,
    pub explain_result: String,
    pub optimized_metrics: MetricsMap,
    pub performance: Option<PerformanceComparison>,
    pub error_info: Option<String>,
    pub is_successful: bool,
}

impl AttemptOutcome {
    /// Generation failed before any SQL existed
    pub fn generation_failed(error: impl ToString) -> Self {
        Self {
            error_info: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttemptLedger {
    attempts: Vec<OptimizationAttempt>,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt, numbering it after the last one
    pub fn record(&mut self, trial_type: TrialType, outcome: AttemptOutcome) -> &OptimizationAttempt {
        let attempt = OptimizationAttempt {
            attempt_number: self.next_attempt_number(),
            trial_type,
            query: outcome.query,
            explain_result: outcome.explain_result,
            optimized_metrics: outcome.optimized_metrics,
            performance: outcome.performance,
            error_info: outcome.error_info,
            is_successful: outcome.is_successful,
        };
        self.attempts.push(attempt);
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn next_attempt_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    pub fn last(&self) -> Option<&OptimizationAttempt> {
        self.attempts.last()
    }

    /// Most recent successful attempt
    pub fn last_successful(&self) -> Option<&OptimizationAttempt> {
        self.attempts.iter().rev().find(|a| a.is_successful)
    }

    pub fn get(&self, attempt_number: u32) -> Option<&OptimizationAttempt> {
        let index = attempt_number.checked_sub(1)? as usize;
        self.attempts.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptimizationAttempt> {
        self.attempts.iter()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn into_attempts(self) -> Vec<OptimizationAttempt> {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(query: &str) -> AttemptOutcome {
        AttemptOutcome {
            query: query.to_string(),
            is_successful: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_numbers_sequentially() {
        let mut ledger = AttemptLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.next_attempt_number(), 1);

        let first = ledger.record(TrialType::Initial, success("SELECT 1;"));
        assert_eq!(first.attempt_number, 1);
        let second = ledger.record(
            TrialType::SingleOptimization,
            AttemptOutcome::generation_failed("timeout"),
        );
        assert_eq!(second.attempt_number, 2);
        assert_eq!(second.query, "");
        assert_eq!(second.error_info.as_deref(), Some("timeout"));
        assert!(!second.is_successful);

        let numbers: Vec<u32> = ledger.iter().map(|a| a.attempt_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_last_successful_scans_backwards() {
        let mut ledger = AttemptLedger::new();
        assert!(ledger.last_successful().is_none());

        ledger.record(TrialType::Initial, success("SELECT 1;"));
        ledger.record(TrialType::SingleOptimization, success("SELECT 2;"));
        ledger.record(
            TrialType::SingleOptimization,
            AttemptOutcome::generation_failed("boom"),
        );

        assert_eq!(ledger.last().map(|a| a.attempt_number), Some(3));
        let last_ok = ledger.last_successful().unwrap();
        assert_eq!(last_ok.attempt_number, 2);
        assert_eq!(last_ok.query, "SELECT 2;");
    }

    #[test]
    fn test_get_by_number() {
        let mut ledger = AttemptLedger::new();
        ledger.record(TrialType::Initial, success("SELECT 1;"));

        assert!(ledger.get(0).is_none());
        assert_eq!(ledger.get(1).map(|a| a.query.as_str()), Some("SELECT 1;"));
        assert!(ledger.get(2).is_none());
        assert_eq!(ledger.into_attempts().len(), 1);
    }
}
