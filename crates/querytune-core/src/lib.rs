//! Querytune Core Library
//!
//! Profile analysis, performance comparison and the iterative LLM-assisted
//! SQL rewrite loop behind the `querytune` CLI.

pub mod bottleneck;
pub mod compare;
pub mod config;
pub mod error;
pub mod format;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod optimize;
pub mod report;
pub mod sql;
