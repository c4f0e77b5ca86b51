//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! request pipeline: cache validators, range negotiation, MIME lookup,
//! response builders and the streaming body.

pub mod body;
pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ArtifactBody;
pub use cache::Conditional;
pub use range::{negotiate, ByteRange, ByteWindow, RangeOutcome};
pub use response::{build_404_response, build_error_response, ResponseBody};
