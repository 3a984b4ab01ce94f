//! The optimization loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::generator::QueryGenerator;
use super::ledger::{AttemptLedger, AttemptOutcome};
use super::types::{OptimizationAttempt, OptimizationResult, TrialType};
use crate::bail_invalid;
use crate::compare::compare_performance;
use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::llm::{GenerationError, TextGenerator};
use crate::metrics::{MetricsMap, MetricsSnapshot};

/// A candidate below this cost ratio ends the run immediately
pub const EARLY_STOP_COST_RATIO: f64 = 0.8;

/// Failure reported by an EXPLAIN/execute hook
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What an EXPLAIN/execute hook learned about a candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplainOutput {
    pub explain_text: String,
    pub metrics: MetricsMap,
}

/// Runs (or plans) a candidate query and reports its metrics
pub trait ExplainHook {
    fn explain(&self, query: &str) -> std::result::Result<ExplainOutput, ExecutionError>;
}

impl<F> ExplainHook for F
where
    F: Fn(&str) -> std::result::Result<ExplainOutput, ExecutionError>,
{
    fn explain(&self, query: &str) -> std::result::Result<ExplainOutput, ExecutionError> {
        self(query)
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSoFar {
    attempt_number: u32,
    cost_ratio: Option<f64>,
}

/// Drives generate → explain → compare rounds and keeps the best candidate.
///
/// Each round depends on the previous one, so rounds run strictly in
/// sequence. Cancellation is only observed between rounds.
pub struct IterativeOptimizer<'h, G> {
    generator: QueryGenerator<G>,
    max_attempts: u32,
    explain_hook: Option<Box<dyn ExplainHook + 'h>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'h, G: TextGenerator> IterativeOptimizer<'h, G> {
    pub fn new(generator: QueryGenerator<G>, config: &OptimizerConfig) -> Self {
        Self {
            generator,
            max_attempts: config.max_optimization_attempts,
            explain_hook: None,
            cancel: None,
        }
    }

    pub fn with_explain_hook(mut self, hook: impl ExplainHook + 'h) -> Self {
        self.explain_hook = Some(Box::new(hook));
        self
    }

    /// Stop before the next round once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the loop for `original_query`.
    ///
    /// Generation and EXPLAIN failures are recorded on attempts and never
    /// returned. The only error is an invalid attempt budget, raised before
    /// the first round.
    #[instrument(skip_all, fields(max_attempts = self.max_attempts, provider = self.generator.provider_name()))]
    pub fn run(
        &self,
        original_query: &str,
        metrics: &MetricsSnapshot,
        bottleneck_report: &str,
    ) -> Result<OptimizationResult> {
        if self.max_attempts == 0 {
            bail_invalid!("max_optimization_attempts", "0 (must be at least 1)");
        }

        let start = Instant::now();
        let baseline = metrics.to_metrics_map();
        let mut ledger = AttemptLedger::new();
        let mut best: Option<BestSoFar> = None;

        for round in 1..=self.max_attempts {
            if self.is_cancelled() {
                warn!(completed = ledger.len(), "Optimization cancelled before round {}", round);
                break;
            }

            let trial_type = select_trial_type(round, &ledger);
            info!(attempt = round, max_attempts = self.max_attempts, %trial_type, "Optimization attempt");

            let candidate = match self.generate(
                trial_type,
                original_query,
                metrics,
                bottleneck_report,
                &ledger,
            ) {
                Ok(sql) => sql,
                Err(e) => {
                    warn!(attempt = round, error = %e, "Query generation failed");
                    ledger.record(trial_type, AttemptOutcome::generation_failed(&e));
                    continue;
                }
            };

            let outcome = self.evaluate(candidate, &baseline);
            let cost_ratio = outcome
                .performance
                .as_ref()
                .map(|p| p.comprehensive_cost_ratio);
            info!(
                attempt = round,
                success = outcome.is_successful,
                cost_ratio = ?cost_ratio,
                "Attempt finished"
            );

            if outcome.is_successful && replaces_best(cost_ratio, best) {
                best = Some(BestSoFar {
                    attempt_number: ledger.next_attempt_number(),
                    cost_ratio,
                });
            }
            ledger.record(trial_type, outcome);

            if cost_ratio.is_some_and(|ratio| ratio < EARLY_STOP_COST_RATIO) {
                info!(attempt = round, "Significant improvement found, stopping early");
                break;
            }
        }

        crate::trace_time!(start, "optimization_run", attempts = ledger.len());
        Ok(assemble_result(original_query, ledger, best))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn generate(
        &self,
        trial_type: TrialType,
        original_query: &str,
        metrics: &MetricsSnapshot,
        bottleneck_report: &str,
        ledger: &AttemptLedger,
    ) -> std::result::Result<String, GenerationError> {
        match trial_type {
            TrialType::ErrorCorrection => {
                let (failed_query, reason) = ledger
                    .last()
                    .map(|last| (last.query.as_str(), failure_reason(last)))
                    .unwrap_or((original_query, "Unknown error".to_string()));
                self.generator
                    .generate_error_corrected(original_query, failed_query, &reason)
            }
            TrialType::SingleOptimization | TrialType::PerformanceImprovement => {
                match ledger.last_successful() {
                    Some(previous) => self.generator.generate_refined(
                        original_query,
                        metrics,
                        previous,
                        bottleneck_report,
                    ),
                    None => {
                        self.generator
                            .generate_optimized(original_query, metrics, bottleneck_report)
                    }
                }
            }
            TrialType::Initial => {
                self.generator
                    .generate_optimized(original_query, metrics, bottleneck_report)
            }
        }
    }

    /// Without a hook the only signal is that generation succeeded
    fn evaluate(&self, candidate: String, baseline: &MetricsMap) -> AttemptOutcome {
        let Some(hook) = &self.explain_hook else {
            return AttemptOutcome {
                query: candidate,
                is_successful: true,
                ..Default::default()
            };
        };

        match hook.explain(&candidate) {
            Err(e) => {
                warn!(error = %e, "EXPLAIN execution failed");
                AttemptOutcome {
                    query: candidate,
                    error_info: Some(e.to_string()),
                    ..Default::default()
                }
            }
            Ok(output) if output.metrics.is_empty() => AttemptOutcome {
                query: candidate,
                explain_result: output.explain_text,
                is_successful: true,
                ..Default::default()
            },
            Ok(output) => {
                let performance = compare_performance(baseline, &output.metrics);
                AttemptOutcome {
                    query: candidate,
                    explain_result: output.explain_text,
                    optimized_metrics: output.metrics,
                    is_successful: performance.is_improved,
                    performance: Some(performance),
                    error_info: None,
                }
            }
        }
    }
}

/// Round 1 is a fresh rewrite; after a failure, correct it; otherwise refine
pub(crate) fn select_trial_type(round: u32, ledger: &AttemptLedger) -> TrialType {
    if round <= 1 {
        return TrialType::Initial;
    }
    match ledger.last() {
        Some(last) if !last.is_successful => TrialType::ErrorCorrection,
        _ => TrialType::SingleOptimization,
    }
}

fn failure_reason(attempt: &OptimizationAttempt) -> String {
    if let Some(error) = &attempt.error_info {
        return error.clone();
    }
    match attempt.cost_ratio() {
        Some(ratio) => format!(
            "Query ran but did not improve performance (cost ratio {ratio:.2})"
        ),
        None => "Unknown error".to_string(),
    }
}

/// A measured candidate beats an unmeasured best; otherwise strictly lower wins
fn replaces_best(candidate: Option<f64>, best: Option<BestSoFar>) -> bool {
    match (best, candidate) {
        (None, _) => true,
        (Some(best), Some(ratio)) => match best.cost_ratio {
            Some(current) => ratio < current,
            None => true,
        },
        (Some(_), None) => false,
    }
}

fn assemble_result(
    original_query: &str,
    ledger: AttemptLedger,
    best: Option<BestSoFar>,
) -> OptimizationResult {
    let attempts = ledger.into_attempts();
    let chosen = best
        .and_then(|b| attempts.iter().find(|a| a.attempt_number == b.attempt_number))
        .map(|a| (a.attempt_number, a.query.clone(), a.performance.clone()));

    match chosen {
        Some((best_attempt_number, best_optimized_query, final_performance)) => {
            OptimizationResult {
                original_query: original_query.to_string(),
                best_optimized_query,
                best_attempt_number,
                attempts,
                final_performance,
                optimization_success: true,
            }
        }
        None => {
            warn!("No successful optimization found, using original query");
            OptimizationResult {
                original_query: original_query.to_string(),
                best_optimized_query: original_query.to_string(),
                best_attempt_number: 0,
                attempts,
                final_performance: None,
                optimization_success: false,
            }
        }
    }
}
