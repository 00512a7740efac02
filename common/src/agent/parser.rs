use crate::error::{CsvSqlError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static STATEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(select|insert|update|delete|create|drop|with|alter|pragma)\b").unwrap()
});

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\s*\n(.*?)```").unwrap()
});

/// extract the sql statement from a model reply that may carry prose or fences
pub fn extract_sql(reply: &str) -> Result<String> {
    let text = reply.trim();

    if text.is_empty() {
        return Err(CsvSqlError::ExternalService(
            "model returned empty output".to_string(),
        ));
    }

    // strip markdown fences if present
    let text = match FENCE_REGEX.captures(text) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or(text),
        None => text,
    };

    // keep everything from the first statement keyword onwards
    let sql = match STATEMENT_REGEX.find(text) {
        Some(mat) => &text[mat.start()..],
        None => text,
    };

    // an unterminated single-line fence leaves stray backticks behind
    let sql = sql.trim().trim_end_matches('`').trim();
    if sql.is_empty() {
        return Err(CsvSqlError::ExternalService(
            "model output contained no sql".to_string(),
        ));
    }

    Ok(sql.to_string())
}
