//! Prompt text for the three rewrite strategies

use std::fmt::Write;

use super::types::OptimizationAttempt;
use crate::format::format_count;
use crate::metrics::MetricsSnapshot;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

const GUIDELINES: &str = "\
1. Add BROADCAST hints for small tables
2. Leverage partition pruning
3. Remove unnecessary columns
4. Optimize JOIN order
5. Apply filters early";

pub(crate) fn optimization_prompt(
    original_query: &str,
    metrics: &MetricsSnapshot,
    bottleneck_report: &str,
) -> String {
    let mut prompt = String::from(
        "You are a Databricks SQL optimization expert.\n\
         Analyze the following query and generate an optimized version with improved performance.\n\n",
    );
    push_sql_section(&mut prompt, "Original Query", original_query);
    push_metrics_section(&mut prompt, metrics);
    push_section(&mut prompt, "Bottleneck Analysis", bottleneck_report);
    push_section(&mut prompt, "Optimization Guidelines", GUIDELINES);
    push_section(
        &mut prompt,
        "Output Format",
        "Output the optimized SQL in a ```sql``` code block.\n\
         Ensure the query returns the same results as the original.",
    );
    prompt
}

pub(crate) fn refinement_prompt(
    original_query: &str,
    metrics: &MetricsSnapshot,
    previous: &OptimizationAttempt,
    bottleneck_report: &str,
) -> String {
    let improved = match &previous.performance {
        Some(performance) => yes_no(performance.is_improved),
        None => "Not measured",
    };

    let mut results = String::new();
    let _ = writeln!(results, "- Trial type: {}", previous.trial_type);
    let _ = writeln!(results, "- Successful: {}", yes_no(previous.is_successful));
    let _ = write!(results, "- Performance improved: {}", improved);
    if let Some(ratio) = previous.cost_ratio() {
        let _ = write!(results, "\n- Cost ratio: {ratio:.2}");
    }

    let mut prompt = String::from(
        "Based on the previous optimization results, generate a further improved query.\n\n",
    );
    push_sql_section(&mut prompt, "Original Query", original_query);
    push_sql_section(&mut prompt, "Previous Optimized Query", &previous.query);
    push_section(&mut prompt, "Previous Results", &results);
    push_metrics_section(&mut prompt, metrics);
    push_section(&mut prompt, "Bottleneck Analysis", bottleneck_report);
    push_section(
        &mut prompt,
        "Instructions",
        "Focus on issues not resolved by the previous optimization,\n\
         and output a further improved SQL in a ```sql``` code block.",
    );
    prompt
}

pub(crate) fn error_correction_prompt(
    original_query: &str,
    failed_query: &str,
    error_message: &str,
) -> String {
    let mut prompt =
        String::from("The following query produced an error. Generate a corrected query.\n\n");
    push_sql_section(&mut prompt, "Original Query (working)", original_query);
    push_sql_section(&mut prompt, "Query with Error", failed_query);
    push_section(&mut prompt, "Error Message", error_message);
    push_section(
        &mut prompt,
        "Instructions",
        "1. Identify the cause of the error\n\
         2. Fix the error without changing the result of the original query\n\
         3. Output the corrected SQL in a ```sql``` code block",
    );
    prompt
}

fn push_section(prompt: &mut String, title: &str, body: &str) {
    let _ = write!(prompt, "## {title}\n{}\n\n", body.trim_end());
}

fn push_sql_section(prompt: &mut String, title: &str, sql: &str) {
    let _ = write!(prompt, "## {title}\n```sql\n{}\n```\n\n", sql.trim());
}

fn push_metrics_section(prompt: &mut String, metrics: &MetricsSnapshot) {
    let body = format!(
        "- Execution time: {} ms\n\
         - Data size: {:.2} GB\n\
         - Rows processed: {}\n\
         - Cache hit ratio: {:.1}%\n\
         - Disk spill: {:.2} GB",
        format_count(metrics.execution_time_ms.max(0.0).round() as u64),
        metrics.total_size_bytes as f64 / GIB,
        format_count(metrics.row_count),
        metrics.cache_hit_ratio * 100.0,
        metrics.spill_to_disk_bytes as f64 / GIB,
    );
    push_section(prompt, "Performance Metrics", &body);
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
