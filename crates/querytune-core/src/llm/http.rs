//! Blocking JSON POST shared by the providers

use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use ureq::Agent;

use super::GenerationError;

/// A JSON-over-HTTPS endpoint with a fixed request timeout
pub(crate) struct JsonEndpoint {
    agent: Agent,
    timeout_secs: u64,
}

impl JsonEndpoint {
    pub(crate) fn new(timeout_secs: u64) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(config),
            timeout_secs,
        }
    }

    /// POST `payload` and return the parsed JSON body of a 2xx response.
    ///
    /// Non-2xx statuses go through [`status_error`].
    pub(crate) fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        payload: &Value,
    ) -> Result<Value, GenerationError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let mut response = request.send(body).map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport_error(e))?;

        debug!(url, status, bytes = text.len(), "provider response");

        if !(200..300).contains(&status) {
            return Err(status_error(status, text));
        }

        serde_json::from_str(&text).map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }

    fn transport_error(&self, error: ureq::Error) -> GenerationError {
        match error {
            ureq::Error::Timeout(_) => {
                GenerationError::Timeout(format!("no response after {}s", self.timeout_secs))
            }
            other => GenerationError::Transport(other.to_string()),
        }
    }
}

/// Map a non-2xx status to an error
pub(crate) fn status_error(status: u16, body: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::Auth(format!("status {status}: {body}")),
        429 => GenerationError::RateLimit(body),
        _ => GenerationError::Api { status, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(401, "nope".into()),
            GenerationError::Auth(_)
        ));
        assert!(matches!(
            status_error(403, "nope".into()),
            GenerationError::Auth(_)
        ));
        assert!(matches!(
            status_error(429, "later".into()),
            GenerationError::RateLimit(_)
        ));
        assert_eq!(
            status_error(500, "boom".into()),
            GenerationError::Api {
                status: 500,
                body: "boom".into()
            }
        );
    }
}
