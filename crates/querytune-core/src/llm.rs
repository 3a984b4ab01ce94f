//! Text generation providers
//!
//! The optimizer only needs "prompt in, text out". Each provider speaks its
//! own HTTP dialect behind [`TextGenerator`]; [`RetryingGenerator`] adds
//! exponential backoff for transient failures and [`create_client`] builds
//! the configured stack.

mod anthropic;
mod azure;
mod databricks;
mod factory;
mod http;
mod openai;
mod retry;

pub use anthropic::AnthropicClient;
pub use azure::AzureOpenAiClient;
pub use databricks::DatabricksClient;
pub use factory::create_client;
pub use openai::OpenAiClient;
pub use retry::{RetryPolicy, RetryingGenerator};

use thiserror::Error;

/// Failure of a single text generation call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("token limit exceeded: {0}")]
    TokenLimit(String),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider not configured: {0}")]
    Config(String),
}

impl GenerationError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::RateLimit(_)
            | GenerationError::Timeout(_)
            | GenerationError::Transport(_) => true,
            GenerationError::Api { status, .. } => *status >= 500,
            GenerationError::Auth(_)
            | GenerationError::TokenLimit(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::Config(_) => false,
        }
    }
}

/// The single capability the optimizer needs from a language model
pub trait TextGenerator {
    /// Generate a completion for `prompt`. May block for the provider's timeout.
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Human-readable provider name for logs
    fn provider_name(&self) -> &str;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt)
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }
}

/// Resolve a secret from explicit config, then the environment
pub(crate) fn resolve_secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    let non_blank = |s: &String| !s.trim().is_empty();
    configured
        .map(str::to_string)
        .filter(non_blank)
        .or_else(|| std::env::var(env_var).ok().filter(non_blank))
}
