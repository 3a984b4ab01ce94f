//! Databricks model serving endpoints

use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::http::JsonEndpoint;
use super::openai::parse_chat_completion;
use super::{resolve_secret, GenerationError, TextGenerator};
use crate::config::DatabricksConfig;

pub const DATABRICKS_TOKEN_ENV: &str = "DATABRICKS_TOKEN";
pub const DATABRICKS_WORKSPACE_URL_ENV: &str = "DATABRICKS_WORKSPACE_URL";

pub struct DatabricksClient {
    config: DatabricksConfig,
    endpoint: JsonEndpoint,
}

impl DatabricksClient {
    /// Fails when no serving endpoint name is configured
    pub fn new(config: DatabricksConfig, timeout_secs: u64) -> Result<Self, GenerationError> {
        if config.endpoint_name.trim().is_empty() {
            return Err(GenerationError::Config(
                "llm.databricks.endpoint_name is not set".to_string(),
            ));
        }

        Ok(Self {
            config,
            endpoint: JsonEndpoint::new(timeout_secs),
        })
    }

    pub fn build_payload(config: &DatabricksConfig, prompt: &str) -> Value {
        let mut payload = json!({
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });

        if config.thinking_enabled {
            payload["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": config.thinking_budget_tokens,
            });
        }

        payload
    }

    /// Extended thinking returns content blocks; only text blocks are kept
    pub fn parse_response(body: &Value) -> Result<String, GenerationError> {
        parse_chat_completion(body)
    }

    /// Invocation URL for a workspace host, with or without a scheme
    pub fn invocation_url(workspace: &str, endpoint_name: &str) -> String {
        let host = workspace
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{host}/serving-endpoints/{endpoint_name}/invocations")
    }

    fn classify(&self, error: GenerationError) -> GenerationError {
        match error {
            GenerationError::Api { status: 400, body }
                if body.to_lowercase().contains("maximum tokens") =>
            {
                GenerationError::TokenLimit(format!(
                    "reduce llm.databricks.max_tokens (currently {}): {body}",
                    self.config.max_tokens
                ))
            }
            other => other,
        }
    }
}

impl TextGenerator for DatabricksClient {
    #[instrument(skip_all, fields(provider = "databricks", endpoint = %self.config.endpoint_name))]
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let token = resolve_secret(self.config.token.as_deref(), DATABRICKS_TOKEN_ENV)
            .ok_or_else(|| {
                GenerationError::Auth(format!(
                    "Databricks token is not configured; set llm.databricks.token or {DATABRICKS_TOKEN_ENV}"
                ))
            })?;
        let workspace = resolve_secret(
            self.config.workspace_url.as_deref(),
            DATABRICKS_WORKSPACE_URL_ENV,
        )
        .ok_or_else(|| {
            GenerationError::Config(format!(
                "Databricks workspace URL is not configured; set llm.databricks.workspace_url or {DATABRICKS_WORKSPACE_URL_ENV}"
            ))
        })?;

        let url = Self::invocation_url(&workspace, &self.config.endpoint_name);
        let payload = Self::build_payload(&self.config, prompt);
        let headers = [("Authorization", format!("Bearer {token}"))];
        let body = self
            .endpoint
            .post(&url, &headers, &payload)
            .map_err(|e| self.classify(e))?;

        let content = Self::parse_response(&body)?;
        debug!(chars = content.len(), "Databricks completion received");
        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "Databricks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_without_thinking() {
        let payload = DatabricksClient::build_payload(&DatabricksConfig::default(), "q");
        assert_eq!(payload["max_tokens"], 32000);
        assert!(payload.get("thinking").is_none());
    }

    #[test]
    fn test_payload_with_thinking() {
        let config = DatabricksConfig {
            thinking_enabled: true,
            thinking_budget_tokens: 2048,
            ..Default::default()
        };
        let payload = DatabricksClient::build_payload(&config, "q");
        assert_eq!(payload["thinking"]["type"], "enabled");
        assert_eq!(payload["thinking"]["budget_tokens"], 2048);
    }

    #[test]
    fn test_invocation_url() {
        assert_eq!(
            DatabricksClient::invocation_url("https://adb-123.azuredatabricks.net/", "claude"),
            "https://adb-123.azuredatabricks.net/serving-endpoints/claude/invocations"
        );
        assert_eq!(
            DatabricksClient::invocation_url("adb-123.azuredatabricks.net", "claude"),
            "https://adb-123.azuredatabricks.net/serving-endpoints/claude/invocations"
        );
    }

    #[test]
    fn test_token_limit_classification() {
        let client = DatabricksClient::new(DatabricksConfig::default(), 1).unwrap();
        let err = client.classify(GenerationError::Api {
            status: 400,
            body: "Input exceeds Maximum Tokens allowed".to_string(),
        });
        assert!(matches!(err, GenerationError::TokenLimit(_)));

        let other = client.classify(GenerationError::Api {
            status: 400,
            body: "bad request".to_string(),
        });
        assert!(matches!(other, GenerationError::Api { status: 400, .. }));
    }

    #[test]
    fn test_parse_thinking_blocks() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "reasoning", "summary": [{"type": "summary_text", "text": "hmm"}]},
            {"type": "text", "text": "SELECT 1;"}
        ]}}]});
        assert_eq!(DatabricksClient::parse_response(&body).unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = DatabricksConfig {
            endpoint_name: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            DatabricksClient::new(config, 1),
            Err(GenerationError::Config(_))
        ));
    }
}
