//! Utilities for extracting structured data from generation output.
//!
//! Model responses often wrap JSON in prose or markdown fences. The
//! extractor first tries the whole text, then falls back to the first
//! balanced `{...}` or `[...]` region.

mod extraction;

pub use extraction::{extract, extract_as, parse_json};
