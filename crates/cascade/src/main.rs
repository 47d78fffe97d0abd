//! Cascade CLI binary.
//!
//! This binary provides command-line access to Cascade's functionality:
//! - Send prompts through the tier cascade
//! - Inspect tier budgets and exhaustion state
//! - Clear the exhaustion registry

use cascade::{CascadeConfig, RequestOptions};
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, reset_tiers, run_request, show_tiers};

    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    #[cfg(feature = "observability")]
    let telemetry = cascade::observability::init_observability_with_config(
        cascade::observability::ObservabilityConfig::default()
            .with_log_level(log_level)
            .with_json_logs(cli.json_logs),
    )?;

    #[cfg(not(feature = "observability"))]
    init_logging(log_level, cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => CascadeConfig::from_file(path)?,
        None => CascadeConfig::load()?,
    };

    let result = match cli.command {
        Commands::Request {
            prompt,
            tier,
            skip_cache,
            feature,
            json,
        } => {
            let options = RequestOptions::default()
                .with_skip_cache(skip_cache)
                .with_feature_label(feature);
            run_request(&config, &prompt, tier.as_deref(), options, json).await
        }

        Commands::Tiers => show_tiers(&config).await,

        Commands::Reset => reset_tiers(&config).await,
    };

    #[cfg(feature = "observability")]
    telemetry.shutdown();

    if let Err(e) = result {
        if e.is_backends_exhausted() {
            eprintln!("Service temporarily saturated, retry later.");
            std::process::exit(2);
        }
        return Err(e.into());
    }

    Ok(())
}

#[cfg(not(feature = "observability"))]
fn init_logging(default_level: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
