//! Iterative query optimization
//!
//! A run alternates between three strategies (fresh rewrite, refinement of
//! the last improvement, correction of the last failure), scores each
//! candidate against the original metrics and keeps the cheapest one. The
//! original query is always the fallback.

mod controller;
mod generator;
mod ledger;
mod prompts;
mod types;


pub use controller::{
    ExecutionError, ExplainHook, ExplainOutput, IterativeOptimizer, EARLY_STOP_COST_RATIO,
};
pub use generator::QueryGenerator;
pub use ledger::{AttemptLedger, AttemptOutcome};
pub use types::{OptimizationAttempt, OptimizationResult, TrialType};
