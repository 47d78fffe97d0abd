//! Shared helpers for facade tests.

#![allow(dead_code)]

mod mock_upstream;
mod recording_sink;

pub use mock_upstream::{MockBehavior, MockUpstream};
pub use recording_sink::{FailingSink, RecordingSink};
