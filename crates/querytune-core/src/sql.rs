//! Pulling SQL out of free-form generated text

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

/// Fenced blocks, tried in order before falling back to bare statements
const FENCED_PATTERNS: [&str; 4] = [
    r"(?is)```sql\s*(.*?)\s*```",
    r"(?is)```\s*(SELECT.*?)\s*```",
    r"(?is)```\s*(WITH.*?)\s*```",
    r"(?is)```\s*(CREATE.*?)\s*```",
];

const BARE_PATTERNS: [&str; 3] = [
    r"(?is)(SELECT\s+.*?;)",
    r"(?is)(WITH\s+.*?;)",
    r"(?is)(CREATE\s+.*?;)",
];

static EXTRACTORS: OnceLock<Vec<Regex>> = OnceLock::new();
static LINE_COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
static BLOCK_COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, pattern, "Failed to compile SQL regex");
            None
        }
    }
}

fn extractors() -> &'static [Regex] {
    EXTRACTORS.get_or_init(|| {
        FENCED_PATTERNS
            .iter()
            .chain(BARE_PATTERNS.iter())
            .filter_map(|pattern| compile(pattern))
            .collect()
    })
}

/// Extract the first SQL statement from generated text.
///
/// Fenced ```sql blocks win, then fenced blocks opening with
/// SELECT/WITH/CREATE, then bare statements terminated by `;`. The match is
/// passed through [`clean_sql`]. An empty string means no SQL was found.
pub fn extract_sql(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    extractors()
        .iter()
        .find_map(|re| re.captures(raw).and_then(|caps| caps.get(1)))
        .map(|m| clean_sql(m.as_str()))
        .unwrap_or_default()
}

/// Normalise a SQL statement.
///
/// Drops `--` and `/* */` comments (keeping `/*+ ... */` optimizer hints),
/// collapses whitespace and ends the statement with exactly one `;`.
pub fn clean_sql(sql: &str) -> String {
    let sql = sql.trim();
    if sql.is_empty() {
        return String::new();
    }

    let mut cleaned = sql.to_string();

    if let Some(re) = LINE_COMMENT.get_or_init(|| compile(r"(?m)--.*$")) {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Some(re) = BLOCK_COMMENT.get_or_init(|| compile(r"(?s)/\*(.*?)\*/")) {
        cleaned = re
            .replace_all(&cleaned, |caps: &Captures| {
                if caps[1].starts_with('+') {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
    }
    if let Some(re) = WHITESPACE.get_or_init(|| compile(r"\s+")) {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }

    let body = cleaned.trim().trim_end_matches(';').trim_end();
    if body.is_empty() {
        return String::new();
    }
    format!("{body};")
}
