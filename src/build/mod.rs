//! Build state module
//!
//! Types describing a finished build, the capability traits a compiler must
//! implement to drive the middleware, and the readiness gate that parks
//! requests while a rebuild is in flight.

mod compiler;
mod gate;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::BuildError;

pub use compiler::PrebuiltCompiler;
pub use gate::{BuildGate, Continuation};

/// One build unit's output as reported by the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutput {
    /// Unit name, if the compiler names its units
    pub name: Option<String>,
    /// Build hash of this unit
    pub hash: String,
    /// Directory the unit emits into
    pub output_path: PathBuf,
    /// Public URL path the unit's assets are served under
    pub public_path: Option<String>,
}

/// Result of a completed build, one entry per unit in configured order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildResult {
    pub units: Vec<UnitOutput>,
}

impl BuildResult {
    pub const fn new(units: Vec<UnitOutput>) -> Self {
        Self { units }
    }

    /// Output roots searched during resolution, in unit order.
    ///
    /// `public_path` overrides every unit's own public path.
    pub fn output_roots(&self, public_path: Option<&str>) -> Vec<OutputRoot> {
        self.units
            .iter()
            .map(|unit| {
                let public = public_path
                    .or(unit.public_path.as_deref())
                    .unwrap_or_default();
                OutputRoot::new(public, unit.output_path.clone())
            })
            .collect()
    }
}

/// A (public URL prefix, output directory) pair searched during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRoot {
    /// URL pathname prefix, always non-empty (`/` when unset)
    pub public_prefix: String,
    pub output_path: PathBuf,
}

impl OutputRoot {
    /// Build a root from a configured public path.
    ///
    /// `auto` and the empty string map to `/`; absolute URLs are reduced to
    /// their pathname.
    pub fn new(public_path: &str, output_path: impl Into<PathBuf>) -> Self {
        let public_prefix = match public_path {
            "" | "auto" => "/".to_string(),
            other => match crate::routing::url_pathname(other) {
                "" => "/".to_string(),
                pathname => pathname.to_string(),
            },
        };
        Self {
            public_prefix,
            output_path: output_path.into(),
        }
    }
}

/// Receives build lifecycle events from a compiler
pub trait BuildObserver: Send + Sync {
    /// A rebuild is starting; the previous result must no longer be served.
    fn on_invalidated(&self);

    /// A build finished.
    fn on_completed(&self, result: BuildResult);
}

/// A running watch session
pub trait Watching: Send + Sync {
    /// Ask the compiler to rebuild.
    fn invalidate(&self);

    /// Stop watching; no further events are emitted.
    fn close(&self) -> Result<(), BuildError>;
}

/// Anything that can build in watch mode and report to an observer
pub trait Compiler {
    fn watch(&self, observer: Arc<dyn BuildObserver>) -> Result<Box<dyn Watching>, BuildError>;
}
