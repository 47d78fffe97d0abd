//! Caller-supplied request options.

use serde::{Deserialize, Serialize};

/// Per-call options for a generation request.
///
/// # Examples
///
/// ```
/// use cascade_core::RequestOptions;
///
/// let options = RequestOptions::default()
///     .with_skip_cache(true)
///     .with_feature_label(Some("auto-tagging".to_string()));
///
/// assert!(*options.skip_cache());
/// assert_eq!(options.feature_label().as_deref(), Some("auto-tagging"));
/// ```
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct RequestOptions {
    /// Bypass the response cache for this call ("force refresh").
    ///
    /// The existing entry is neither read nor overwritten.
    #[serde(default)]
    skip_cache: bool,

    /// Label of the calling feature, carried into usage records.
    #[serde(default)]
    feature_label: Option<String>,
}

impl RequestOptions {
    /// Feature label, or `"unlabeled"` when the caller gave none.
    pub fn feature(&self) -> &str {
        self.feature_label.as_deref().unwrap_or("unlabeled")
    }
}
