//! Configuration type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryTuneError;

/// Default number of optimization rounds
pub const DEFAULT_MAX_OPTIMIZATION_ATTEMPTS: u32 = 3;

/// Default number of provider-level attempts per generation call
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default provider request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Optimizer configuration, passed explicitly to the generator and controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Number of rewrite rounds the controller may run (must be >= 1)
    #[serde(default = "default_max_optimization_attempts")]
    pub max_optimization_attempts: u32,

    /// Attempts per generation call before the round is recorded as failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Directory for saved reports and SQL files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Text-generation provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Bottleneck analyzer thresholds
    #[serde(default)]
    pub bottleneck: BottleneckConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_optimization_attempts: DEFAULT_MAX_OPTIMIZATION_ATTEMPTS,
            max_retries: DEFAULT_MAX_RETRIES,
            output_dir: default_output_dir(),
            llm: LlmConfig::default(),
            bottleneck: BottleneckConfig::default(),
        }
    }
}

/// Supported text-generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Databricks,
    #[default]
    Openai,
    AzureOpenai,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Databricks,
        Provider::Openai,
        Provider::AzureOpenai,
        Provider::Anthropic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Databricks => "databricks",
            Provider::Openai => "openai",
            Provider::AzureOpenai => "azure_openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = QueryTuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                let supported = Provider::ALL.map(|p| p.as_str()).join(", ");
                QueryTuneError::unsupported("provider", s, supported)
            })
    }
}

/// Provider selection plus per-provider sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Request timeout for a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub databricks: DatabricksConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub azure_openai: AzureOpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            databricks: DatabricksConfig::default(),
            openai: OpenAiConfig::default(),
            azure_openai: AzureOpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

/// Databricks model serving endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabricksConfig {
    #[serde(default = "default_databricks_endpoint")]
    pub endpoint_name: String,

    /// Workspace host, falls back to DATABRICKS_WORKSPACE_URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_url: Option<String>,

    /// Personal access token, falls back to DATABRICKS_TOKEN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_databricks_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,

    #[serde(default)]
    pub thinking_enabled: bool,

    #[serde(default = "default_thinking_budget")]
    pub thinking_budget_tokens: u32,
}

impl Default for DatabricksConfig {
    fn default() -> Self {
        Self {
            endpoint_name: default_databricks_endpoint(),
            workspace_url: None,
            token: None,
            max_tokens: default_databricks_max_tokens(),
            temperature: 0.0,
            thinking_enabled: false,
            thinking_budget_tokens: default_thinking_budget(),
        }
    }
}

/// OpenAI chat completions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key, falls back to OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,

    /// Override for proxies and compatible gateways
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            base_url: default_openai_base_url(),
        }
    }
}

/// Azure OpenAI deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureOpenAiConfig {
    /// API key, falls back to AZURE_OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub deployment_name: String,

    #[serde(default = "default_azure_api_version")]
    pub api_version: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: String::new(),
            deployment_name: String::new(),
            api_version: default_azure_api_version(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

/// Anthropic messages API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key, falls back to ANTHROPIC_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

/// Thresholds used by the bottleneck analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckConfig {
    /// Shuffle memory per partition above which partition skew is reported
    #[serde(default = "default_memory_per_partition_threshold_mb")]
    pub memory_per_partition_threshold_mb: u64,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            memory_per_partition_threshold_mb: default_memory_per_partition_threshold_mb(),
        }
    }
}

impl BottleneckConfig {
    pub fn memory_per_partition_threshold_bytes(&self) -> u64 {
        self.memory_per_partition_threshold_mb * 1024 * 1024
    }
}

fn default_max_optimization_attempts() -> u32 {
    DEFAULT_MAX_OPTIMIZATION_ATTEMPTS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_databricks_endpoint() -> String {
    "databricks-claude-sonnet-4".to_string()
}

fn default_databricks_max_tokens() -> u32 {
    32000
}

fn default_thinking_budget() -> u32 {
    10000
}

fn default_max_tokens() -> u32 {
    16000
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_memory_per_partition_threshold_mb() -> u64 {
    512
}
