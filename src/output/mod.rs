//! Output formatting and persistence hand-off for run results.
//!
//! This module provides formatters for displaying `RunResult` in different formats:
//! - Terminal: Human-readable summary with colors and box drawing
//! - JSON: Machine-readable serialization
//!
//! Writing results to durable storage is left to implementations of
//! [`ResultSink`].

mod json;
mod sink;
mod terminal;

pub use json::{to_json, to_json_pretty};
pub use sink::{JsonLinesSink, ResultSink};
pub use terminal::format_summary;
