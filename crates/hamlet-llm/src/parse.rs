//! JSON recovery for LLM responses.
//!
//! Models frequently wrap their JSON in markdown fences or leave
//! trailing commas. Parsing tries, in order: the raw text, the content
//! of a code fence, a trailing-comma-stripped copy, and the stripped
//! fence content. Only when every strategy fails does the caller see
//! an invalid-response error.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// Parse a typed value out of raw LLM response text.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = extract_from_codeblock(trimmed)
        && let Ok(value) = serde_json::from_str::<T>(inner)
    {
        return Ok(value);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(value) = serde_json::from_str::<T>(&cleaned) {
        return Ok(value);
    }

    if let Some(inner) = extract_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(inner);
        if let Ok(value) = serde_json::from_str::<T>(&cleaned_inner) {
            return Ok(value);
        }
    }

    Err(LlmError::InvalidResponse {
        message: format!("all parse strategies failed for: {trimmed}"),
    })
}

/// Pull the body out of a ```json ... ``` (or plain ```) fence.
fn extract_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    // Skip an optional language tag up to the first newline.
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Remove commas that directly precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            // Look ahead past whitespace for a closer.
            let mut lookahead = chars.clone();
            let mut next_non_ws = None;
            for n in lookahead.by_ref() {
                if !n.is_whitespace() {
                    next_non_ws = Some(n);
                    break;
                }
            }
            if matches!(next_non_ws, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
