//! `cascade tiers` and `cascade reset` handlers.

use cascade::{CascadeConfig, CascadeResult, SystemClock, load_router};
use std::sync::Arc;

/// Print each tier's budget and current state.
pub async fn show_tiers(config: &CascadeConfig) -> CascadeResult<()> {
    let router = load_router(config, Arc::new(SystemClock)).await?;

    println!(
        "{:<28} {:>8} {:>6} {:>12}  {}",
        "TIER", "PRIORITY", "RPM", "INTERVAL", "STATUS"
    );
    for status in router.tier_status().await {
        let state = if status.exhausted {
            "exhausted"
        } else if status.ready {
            "ready"
        } else {
            "busy"
        };
        println!(
            "{:<28} {:>8} {:>6} {:>10}ms  {}",
            status.id,
            status.priority,
            status.rpm,
            status.min_interval.as_millis(),
            state
        );
    }

    if let Some(saved_at) = router.exhaustion_saved_at().await {
        println!("\nExhaustion state last changed {}", saved_at.to_rfc3339());
    }
    Ok(())
}

/// Clear the exhaustion registry.
pub async fn reset_tiers(config: &CascadeConfig) -> CascadeResult<()> {
    let router = load_router(config, Arc::new(SystemClock)).await?;
    let cleared = router.reset_exhaustion().await?;
    println!("Cleared {} exhausted tier(s)", cleared);
    Ok(())
}
