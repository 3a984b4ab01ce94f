//! Azure OpenAI deployments

use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::http::JsonEndpoint;
use super::openai::parse_chat_completion;
use super::{resolve_secret, GenerationError, TextGenerator};
use crate::config::AzureOpenAiConfig;

pub const AZURE_OPENAI_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";

pub struct AzureOpenAiClient {
    config: AzureOpenAiConfig,
    endpoint: JsonEndpoint,
}

impl AzureOpenAiClient {
    /// Fails when the endpoint or deployment name is missing
    pub fn new(config: AzureOpenAiConfig, timeout_secs: u64) -> Result<Self, GenerationError> {
        if config.endpoint.trim().is_empty() {
            return Err(GenerationError::Config(
                "llm.azure_openai.endpoint is not set".to_string(),
            ));
        }
        if config.deployment_name.trim().is_empty() {
            return Err(GenerationError::Config(
                "llm.azure_openai.deployment_name is not set".to_string(),
            ));
        }

        Ok(Self {
            config,
            endpoint: JsonEndpoint::new(timeout_secs),
        })
    }

    pub fn build_payload(config: &AzureOpenAiConfig, prompt: &str) -> Value {
        json!({
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }

    pub fn parse_response(body: &Value) -> Result<String, GenerationError> {
        parse_chat_completion(body)
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment_name,
            self.config.api_version
        )
    }
}

impl TextGenerator for AzureOpenAiClient {
    #[instrument(skip_all, fields(provider = "azure_openai", deployment = %self.config.deployment_name))]
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key =
            resolve_secret(self.config.api_key.as_deref(), AZURE_OPENAI_API_KEY_ENV)
                .ok_or_else(|| {
                    GenerationError::Auth(format!(
                        "Azure OpenAI API key is not configured; set llm.azure_openai.api_key or {AZURE_OPENAI_API_KEY_ENV}"
                    ))
                })?;

        let payload = Self::build_payload(&self.config, prompt);
        let headers = [("api-key", api_key)];
        let body = self.endpoint.post(&self.url(), &headers, &payload)?;

        let content = Self::parse_response(&body)?;
        debug!(chars = content.len(), "Azure OpenAI completion received");
        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "Azure OpenAI"
    }
}
