use tracing::info;

use super::{
    AnthropicClient, AzureOpenAiClient, DatabricksClient, OpenAiClient, RetryPolicy,
    RetryingGenerator, TextGenerator,
};
use crate::config::{LlmConfig, Provider};
use crate::error::Result;

/// Build the configured provider wrapped in retry/backoff.
///
/// Structural misconfiguration (no Azure endpoint, no Databricks serving
/// endpoint) fails here. Missing credentials surface on the first
/// `generate` call instead, so the optimizer records them per attempt.
pub fn create_client(config: &LlmConfig, max_retries: u32) -> Result<Box<dyn TextGenerator>> {
    let timeout = config.timeout_secs;

    let client: Box<dyn TextGenerator> = match config.provider {
        Provider::Openai => Box::new(OpenAiClient::new(config.openai.clone(), timeout)),
        Provider::AzureOpenai => Box::new(AzureOpenAiClient::new(
            config.azure_openai.clone(),
            timeout,
        )?),
        Provider::Anthropic => Box::new(AnthropicClient::new(config.anthropic.clone(), timeout)),
        Provider::Databricks => Box::new(DatabricksClient::new(
            config.databricks.clone(),
            timeout,
        )?),
    };

    info!(
        provider = %config.provider,
        timeout_secs = timeout,
        max_retries,
        "Text generation client ready"
    );

    Ok(Box::new(RetryingGenerator::new(
        client,
        RetryPolicy::new(max_retries),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryTuneError;
    use crate::llm::GenerationError;

    #[test]
    fn test_default_provider_is_openai() {
        let client = create_client(&LlmConfig::default(), 3).unwrap();
        assert_eq!(client.provider_name(), "OpenAI");
    }

    #[test]
    fn test_each_provider_name() {
        let mut config = LlmConfig::default();
        config.azure_openai.endpoint = "https://example.openai.azure.com".to_string();
        config.azure_openai.deployment_name = "gpt4o".to_string();

        let expected = [
            (Provider::Databricks, "Databricks"),
            (Provider::Openai, "OpenAI"),
            (Provider::AzureOpenai, "Azure OpenAI"),
            (Provider::Anthropic, "Anthropic"),
        ];
        for (provider, name) in expected {
            config.provider = provider;
            let client = create_client(&config, 1).unwrap();
            assert_eq!(client.provider_name(), name);
        }
    }

    #[test]
    fn test_unconfigured_azure_fails_fast() {
        let config = LlmConfig {
            provider: Provider::AzureOpenai,
            ..Default::default()
        };
        let err = create_client(&config, 3).err().unwrap();
        assert!(matches!(
            err,
            QueryTuneError::Generation(GenerationError::Config(_))
        ));
    }
}
