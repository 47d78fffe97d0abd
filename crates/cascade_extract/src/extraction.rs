//! Balanced-region JSON extraction.

use cascade_error::{CascadeResult, JsonError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Characters of offending text kept in error messages.
const PREVIEW_CHARS: usize = 200;

/// Extract the first JSON value from `text`.
///
/// Strategies, in order:
/// 1. The whole trimmed text parses as JSON
/// 2. The first balanced `{...}` / `[...]` region outside any quoted string
///
/// Returns `None` when neither yields valid JSON.
///
/// # Examples
///
/// ```
/// use cascade_extract::extract;
/// use serde_json::json;
///
/// let response = "Sure! Here you go:\n```json\n{\"tags\": [\"rust\", \"async\"]}\n```\nAnything else?";
/// assert_eq!(extract(response), Some(json!({"tags": ["rust", "async"]})));
///
/// assert_eq!(extract("no structure here"), None);
/// ```
pub fn extract(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let region = balanced_region(trimmed)?;
    match serde_json::from_str(region) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(
                error = %e,
                region_length = region.len(),
                "Balanced region is not valid JSON"
            );
            None
        }
    }
}

/// Extract the first JSON value from `text` and deserialize it as `T`.
///
/// # Examples
///
/// ```
/// use cascade_extract::extract_as;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Verdict {
///     score: u8,
/// }
///
/// let verdict: Verdict = extract_as("Result: {\"score\": 7}").unwrap();
/// assert_eq!(verdict.score, 7);
/// ```
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract(text)?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            tracing::debug!(error = %e, "Extracted JSON does not match the expected shape");
            None
        }
    }
}

/// Strictly parse `text` as JSON into `T`.
///
/// # Errors
///
/// Returns a `JsonError` carrying the parse error and a preview of the text.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> CascadeResult<T> {
    serde_json::from_str(text.trim()).map_err(|e| {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if text.chars().count() > PREVIEW_CHARS {
            "..."
        } else {
            ""
        };

        tracing::error!(
            error = %e,
            text_length = text.len(),
            "Failed to parse JSON"
        );

        JsonError::new(format!(
            "{} (line {}, column {}). Text: {}{}",
            e,
            e.line(),
            e.column(),
            preview,
            ellipsis
        ))
        .into()
    })
}

/// Slice of the first balanced region opened by `{` or `[` outside a string.
///
/// One depth counter covers both bracket kinds; an unescaped `"` toggles
/// the in-string flag.
fn balanced_region(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' | ']' if !in_string => {
                if let Some(open) = start {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[open..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}
