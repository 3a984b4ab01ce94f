//! Anthropic messages API

use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::http::JsonEndpoint;
use super::openai::join_text_blocks;
use super::{resolve_secret, GenerationError, TextGenerator};
use crate::config::AnthropicConfig;

pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    config: AnthropicConfig,
    endpoint: JsonEndpoint,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig, timeout_secs: u64) -> Self {
        Self {
            config,
            endpoint: JsonEndpoint::new(timeout_secs),
        }
    }

    pub fn build_payload(config: &AnthropicConfig, prompt: &str) -> Value {
        json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": [{"role": "user", "content": prompt}],
        })
    }

    /// Concatenated text blocks of `content`
    pub fn parse_response(body: &Value) -> Result<String, GenerationError> {
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| GenerationError::MalformedResponse("missing content".to_string()))?;

        let text = join_text_blocks(blocks);
        if text.is_empty() && !blocks.is_empty() {
            return Err(GenerationError::MalformedResponse(
                "no text block in content".to_string(),
            ));
        }
        Ok(text)
    }
}

impl TextGenerator for AnthropicClient {
    #[instrument(skip_all, fields(provider = "anthropic", model = %self.config.model))]
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = resolve_secret(self.config.api_key.as_deref(), ANTHROPIC_API_KEY_ENV)
            .ok_or_else(|| {
                GenerationError::Auth(format!(
                    "Anthropic API key is not configured; set llm.anthropic.api_key or {ANTHROPIC_API_KEY_ENV}"
                ))
            })?;

        let payload = Self::build_payload(&self.config, prompt);
        let headers = [
            ("x-api-key", api_key),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let body = self.endpoint.post(API_URL, &headers, &payload)?;

        let content = Self::parse_response(&body)?;
        debug!(chars = content.len(), "Anthropic completion received");
        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
