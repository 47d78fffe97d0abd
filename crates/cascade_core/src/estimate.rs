//! Size-derived token and cost estimates.
//!
//! The upstream does not report usage for every tier, so observability
//! records carry estimates derived from text length.

/// Average characters per token for English prose.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` (one token per four characters, rounded up).
///
/// # Examples
///
/// ```
/// use cascade_core::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

/// Estimated cost in USD for a call, given per-million-token prices.
///
/// # Examples
///
/// ```
/// use cascade_core::estimate_cost;
///
/// let cost = estimate_cost(1_000_000, 500_000, 0.10, 0.40);
/// assert!((cost - 0.30).abs() < 1e-9);
/// ```
pub fn estimate_cost(
    input_tokens: u64,
    output_tokens: u64,
    cost_per_million_input_tokens: f64,
    cost_per_million_output_tokens: f64,
) -> f64 {
    (input_tokens as f64 * cost_per_million_input_tokens
        + output_tokens as f64 * cost_per_million_output_tokens)
        / 1_000_000.0
}
