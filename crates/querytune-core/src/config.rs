//! Optimizer configuration
//!
//! Configuration lives in a TOML file, resolved from an explicit path, the
//! `QUERYTUNE_CONFIG_DIR` directory, or `<config dir>/querytune/config.toml`.
//! A missing file yields defaults.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::bail_invalid;
use crate::error::{QueryTuneError, Result};

pub use types::{
    AnthropicConfig, AzureOpenAiConfig, BottleneckConfig, DatabricksConfig, LlmConfig,
    OpenAiConfig, OptimizerConfig, Provider, DEFAULT_MAX_OPTIMIZATION_ATTEMPTS,
    DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};

const CONFIG_DIR: &str = "querytune";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV_VAR: &str = "QUERYTUNE_CONFIG_DIR";

impl OptimizerConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if let Ok(env_dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
            PathBuf::from(env_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| {
                    QueryTuneError::Other("unable to determine config directory".to_string())
                })?
                .join(CONFIG_DIR)
        };

        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| QueryTuneError::io_operation("read config", path.display(), e))?;
        let config: OptimizerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load configuration, falling back to defaults when no file exists
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(QueryTuneError::not_found("config file", path.display()));
            }
            return Self::load(path);
        }

        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    QueryTuneError::io_operation("create config directory", parent.display(), e)
                })?;
            }
        }

        let content = self.to_toml()?;
        fs::write(path, content)
            .map_err(|e| QueryTuneError::io_operation("write config", path.display(), e))?;
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| QueryTuneError::Other(format!("failed to serialize config: {}", e)))
    }

    /// Reject configurations the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_optimization_attempts == 0 {
            bail_invalid!("max_optimization_attempts", "0 (must be at least 1)");
        }

        let temperatures = [
            ("llm.databricks.temperature", self.llm.databricks.temperature),
            ("llm.openai.temperature", self.llm.openai.temperature),
            ("llm.azure_openai.temperature", self.llm.azure_openai.temperature),
            ("llm.anthropic.temperature", self.llm.anthropic.temperature),
        ];
        for (name, value) in temperatures {
            if !value.is_finite() || value < 0.0 {
                bail_invalid!(name, value);
            }
        }

        Ok(())
    }
}
