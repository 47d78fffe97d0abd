//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the cascade binary.

mod commands;
mod request;
mod tiers;

pub use commands::{Cli, Commands};
pub use request::run_request;
pub use tiers::{reset_tiers, show_tiers};
