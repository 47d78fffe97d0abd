//! Tier trait for representing a backend's budget and routing rank.

use std::time::Duration;

/// Safety margin applied on top of the exact RPM spacing.
pub const DEFAULT_SPACING_MARGIN: f64 = 1.1;

/// Represents one interchangeable backend tier of the generation service.
///
/// # Example
///
/// ```
/// use cascade_rate_limit::Tier;
/// use std::time::Duration;
///
/// struct Lite;
///
/// impl Tier for Lite {
///     fn id(&self) -> &str { "gemini-2.5-flash-lite" }
///     fn name(&self) -> &str { "Flash Lite" }
///     fn rpm(&self) -> u32 { 60 }
///     fn priority(&self) -> u32 { 0 }
///     fn cost_per_million_input_tokens(&self) -> f64 { 0.10 }
///     fn cost_per_million_output_tokens(&self) -> f64 { 0.40 }
/// }
///
/// assert_eq!(Lite.min_interval(1.1), Duration::from_millis(1100));
/// ```
pub trait Tier: Send + Sync {
    /// Identifier sent to the upstream (e.g. a model name).
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Requests-per-minute budget.
    fn rpm(&self) -> u32;

    /// Routing rank; lower is more preferred.
    fn priority(&self) -> u32;

    /// Cost per million input tokens in USD.
    fn cost_per_million_input_tokens(&self) -> f64;

    /// Cost per million output tokens in USD.
    fn cost_per_million_output_tokens(&self) -> f64;

    /// Minimum spacing between request starts: `ceil(60000 / rpm * margin)` ms.
    ///
    /// A zero budget is treated as one request per minute.
    fn min_interval(&self, margin: f64) -> Duration {
        let rpm = f64::from(self.rpm().max(1));
        // Guard against 60000 * 1.1 landing a hair above the integer.
        let millis = (60_000.0 / rpm * margin - 1e-9).ceil().max(0.0);
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u32);

    impl Tier for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }
        fn name(&self) -> &str {
            "Fixed"
        }
        fn rpm(&self) -> u32 {
            self.0
        }
        fn priority(&self) -> u32 {
            0
        }
        fn cost_per_million_input_tokens(&self) -> f64 {
            0.0
        }
        fn cost_per_million_output_tokens(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn interval_applies_margin_and_rounds_up() {
        assert_eq!(Fixed(1).min_interval(1.1), Duration::from_millis(66_000));
        assert_eq!(Fixed(60).min_interval(1.1), Duration::from_millis(1_100));
        assert_eq!(Fixed(7).min_interval(1.1), Duration::from_millis(9_429));
        assert_eq!(Fixed(15).min_interval(1.0), Duration::from_millis(4_000));
    }

    #[test]
    fn zero_budget_is_one_per_minute() {
        assert_eq!(Fixed(0).min_interval(1.0), Duration::from_millis(60_000));
    }
}
