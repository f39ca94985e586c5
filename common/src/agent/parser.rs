use crate::error::{Result, TabletalkError};
use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:\w+)?\s*(.*?)```").unwrap());

/// interior of the first fenced block, or the whole text when there is none
pub fn strip_code_fence(text: &str) -> String {
    match FENCE_REGEX.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// fence-stripped model output that must not be empty
pub fn extract_statement(stage: &str, output: &str) -> Result<String> {
    let statement = strip_code_fence(output);

    if statement.is_empty() {
        return Err(TabletalkError::Synthesis(format!(
            "{} stage: model returned no statement",
            stage
        )));
    }

    Ok(statement)
}
