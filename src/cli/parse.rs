use querytune_core::config::Provider;
use querytune_core::format::OutputFormat;

/// Parse output format from string
pub fn parse_output_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Parse provider name from string
pub fn parse_provider(s: &str) -> std::result::Result<Provider, String> {
    s.parse::<Provider>().map_err(|e| e.to_string())
}

/// Parse an attempt budget, rejecting zero
pub fn parse_attempts(s: &str) -> std::result::Result<u32, String> {
    match s.parse::<u32>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
