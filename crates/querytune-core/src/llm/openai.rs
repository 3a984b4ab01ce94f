//! OpenAI chat completions

use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::http::JsonEndpoint;
use super::{resolve_secret, GenerationError, TextGenerator};
use crate::config::OpenAiConfig;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub struct OpenAiClient {
    config: OpenAiConfig,
    endpoint: JsonEndpoint,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig, timeout_secs: u64) -> Self {
        Self {
            config,
            endpoint: JsonEndpoint::new(timeout_secs),
        }
    }

    pub fn build_payload(config: &OpenAiConfig, prompt: &str) -> Value {
        json!({
            "model": config.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }

    pub fn parse_response(body: &Value) -> Result<String, GenerationError> {
        parse_chat_completion(body)
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl TextGenerator for OpenAiClient {
    #[instrument(skip_all, fields(provider = "openai", model = %self.config.model))]
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = resolve_secret(self.config.api_key.as_deref(), OPENAI_API_KEY_ENV)
            .ok_or_else(|| {
                GenerationError::Auth(format!(
                    "OpenAI API key is not configured; set llm.openai.api_key or {OPENAI_API_KEY_ENV}"
                ))
            })?;

        let payload = Self::build_payload(&self.config, prompt);
        let headers = [("Authorization", format!("Bearer {api_key}"))];
        let body = self.endpoint.post(&self.url(), &headers, &payload)?;

        let content = Self::parse_response(&body)?;
        debug!(chars = content.len(), "OpenAI completion received");
        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

/// Content of the first choice of a chat-completions style response.
///
/// `content` may be a plain string or a list of typed blocks, in which case
/// the `text` blocks are concatenated.
pub(crate) fn parse_chat_completion(body: &Value) -> Result<String, GenerationError> {
    let content = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .ok_or_else(|| {
            GenerationError::MalformedResponse("missing choices[0].message.content".to_string())
        })?;

    match content {
        Value::String(text) => Ok(text.clone()),
        Value::Array(blocks) => Ok(join_text_blocks(blocks)),
        other => Err(GenerationError::MalformedResponse(format!(
            "unexpected content type: {other}"
        ))),
    }
}

/// Concatenate `{"type": "text", "text": ...}` blocks, skipping the rest
pub(crate) fn join_text_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}
