//! Candidate SQL generation on top of a [`TextGenerator`]

use tracing::{debug, warn};

use super::prompts;
use super::types::OptimizationAttempt;
use crate::llm::{GenerationError, TextGenerator};
use crate::metrics::MetricsSnapshot;
use crate::sql::extract_sql;

/// Turns prompts into candidate SQL.
///
/// Generation errors propagate. Text without extractable SQL does not: each
/// operation falls back to a known query and logs a warning.
pub struct QueryGenerator<G> {
    client: G,
}

impl<G: TextGenerator> QueryGenerator<G> {
    pub fn new(client: G) -> Self {
        Self { client }
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Fresh rewrite of the original; falls back to the original query
    pub fn generate_optimized(
        &self,
        original_query: &str,
        metrics: &MetricsSnapshot,
        bottleneck_report: &str,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::optimization_prompt(original_query, metrics, bottleneck_report);
        let response = self.client.generate(&prompt)?;
        Ok(extract_or_fallback(&response, original_query, "original"))
    }

    /// Refinement of a previous success; falls back to that attempt's query
    pub fn generate_refined(
        &self,
        original_query: &str,
        metrics: &MetricsSnapshot,
        previous: &OptimizationAttempt,
        bottleneck_report: &str,
    ) -> Result<String, GenerationError> {
        let prompt =
            prompts::refinement_prompt(original_query, metrics, previous, bottleneck_report);
        let response = self.client.generate(&prompt)?;
        Ok(extract_or_fallback(&response, &previous.query, "previous"))
    }

    /// Fix for a failed candidate; falls back to the original query
    pub fn generate_error_corrected(
        &self,
        original_query: &str,
        failed_query: &str,
        error_message: &str,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::error_correction_prompt(original_query, failed_query, error_message);
        let response = self.client.generate(&prompt)?;
        Ok(extract_or_fallback(&response, original_query, "original"))
    }
}

fn extract_or_fallback(response: &str, fallback: &str, fallback_label: &str) -> String {
    let sql = extract_sql(response);
    if sql.is_empty() {
        warn!(
            fallback = fallback_label,
            response_chars = response.len(),
            "Could not extract SQL from generated text, reusing the {} query",
            fallback_label
        );
        return fallback.to_string();
    }
    debug!(chars = sql.len(), "Extracted candidate SQL");
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::TrialType;
    use std::cell::RefCell;

    /// Replies with a fixed text and remembers the prompts it saw
    struct Canned {
        reply: Result<String, GenerationError>,
        prompts: RefCell<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for Canned {
        fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone()
        }

        fn provider_name(&self) -> &str {
            "canned"
        }
    }

    fn previous(query: &str) -> OptimizationAttempt {
        OptimizationAttempt {
            attempt_number: 1,
            trial_type: TrialType::Initial,
            query: query.to_string(),
            explain_result: String::new(),
            optimized_metrics: Default::default(),
            performance: None,
            error_info: None,
            is_successful: true,
        }
    }

    #[test]
    fn test_optimized_extracts_sql() {
        let generator = QueryGenerator::new(Canned::ok(
            "Try this:\n```sql\nSELECT /*+ BROADCAST(d) */ *\nFROM f JOIN d USING (k)\n```",
        ));
        let sql = generator
            .generate_optimized("SELECT * FROM f JOIN d USING (k)", &MetricsSnapshot::default(), "")
            .unwrap();
        assert_eq!(sql, "SELECT /*+ BROADCAST(d) */ * FROM f JOIN d USING (k);");
    }

    #[test]
    fn test_optimized_falls_back_to_original_verbatim() {
        let original = "select *\n  from   sales";
        let generator = QueryGenerator::new(Canned::ok("I don't see any way to improve this."));
        let sql = generator
            .generate_optimized(original, &MetricsSnapshot::default(), "")
            .unwrap();
        assert_eq!(sql, original);
    }

    #[test]
    fn test_refined_falls_back_to_previous_query() {
        let generator = QueryGenerator::new(Canned::ok("no sql here"));
        let sql = generator
            .generate_refined(
                "SELECT * FROM sales",
                &MetricsSnapshot::default(),
                &previous("SELECT id FROM sales;"),
                "",
            )
            .unwrap();
        assert_eq!(sql, "SELECT id FROM sales;");
    }

    #[test]
    fn test_error_corrected_falls_back_to_original() {
        let generator = QueryGenerator::new(Canned::ok(""));
        let sql = generator
            .generate_error_corrected("SELECT 1", "SELEC 1", "syntax error")
            .unwrap();
        assert_eq!(sql, "SELECT 1");

        let prompts = generator.client.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("SELEC 1"));
        assert!(prompts[0].contains("syntax error"));
    }

    #[test]
    fn test_generation_error_propagates() {
        let generator = QueryGenerator::new(Canned {
            reply: Err(GenerationError::Timeout("300s".into())),
            prompts: RefCell::new(Vec::new()),
        });
        let err = generator
            .generate_optimized("SELECT 1", &MetricsSnapshot::default(), "")
            .unwrap_err();
        assert_eq!(err, GenerationError::Timeout("300s".into()));
    }
}
