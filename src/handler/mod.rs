//! Request handler module
//!
//! Responsible for turning one request into a response (or handing it on)
//! against the current build. The hosting server decides what to do with
//! requests the pipeline passes through.

mod pipeline;

// Re-export main entry point
pub use pipeline::{Outcome, Pipeline};
