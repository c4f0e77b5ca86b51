//! Development middleware that serves a watching compiler's build output.
//!
//! Requests are held while a rebuild is in flight, resolved across the
//! build's output roots, and answered with conditional-GET and byte-range
//! support.

pub mod build;
pub mod config;
pub mod error;
pub mod fs;
pub mod handler;
pub mod http;
pub mod logger;
pub mod middleware;
pub mod routing;
pub mod server;

pub use build::{BuildGate, BuildObserver, BuildResult, Compiler, PrebuiltCompiler, UnitOutput, Watching};
pub use error::{BuildError, ConfigError, ServeError};
pub use fs::{DiskFileSystem, MemoryFileSystem, OutputFileSystem};
pub use handler::Outcome;
pub use middleware::{DevMiddleware, MiddlewareOptions};
