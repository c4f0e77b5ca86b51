//! Dev middleware handle
//!
//! `DevMiddleware` owns the watch session, the readiness gate and the output
//! filesystem. Hosting code calls [`DevMiddleware::handle`] per request and
//! the control methods from application code.

use std::sync::Arc;

use hyper::{Request, Response};
use tokio::runtime::Handle;

use crate::build::{BuildGate, BuildObserver, BuildResult, Compiler, Watching};
use crate::config::{IndexSetting, MiddlewareConfig};
use crate::error::{BuildError, ServeError};
use crate::fs::OutputFileSystem;
use crate::handler::{Outcome, Pipeline};
use crate::routing::{self, IndexPolicy, ResolvedArtifact};

/// Request-handling options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareOptions {
    /// Directory index lookup
    pub index: IndexPolicy,
    /// Emit `Last-Modified`
    pub last_modified: bool,
    /// Public path applied to every unit, overriding the compiler's
    pub public_path: Option<String>,
}

impl From<&MiddlewareConfig> for MiddlewareOptions {
    fn from(config: &MiddlewareConfig) -> Self {
        let index = match &config.index {
            IndexSetting::Enabled(true) => IndexPolicy::default(),
            IndexSetting::Enabled(false) => IndexPolicy::Disabled,
            IndexSetting::File(name) => IndexPolicy::File(name.clone()),
        };
        Self {
            index,
            last_modified: config.last_modified,
            public_path: config.public_path.clone(),
        }
    }
}

struct Inner {
    pipeline: Pipeline,
    watching: Box<dyn Watching>,
}

/// Cheap-to-clone handle to one serving session
#[derive(Clone)]
pub struct DevMiddleware {
    inner: Arc<Inner>,
}

impl DevMiddleware {
    /// Start watching with `compiler` on the current tokio runtime.
    pub fn new(
        compiler: &dyn Compiler,
        fs: Arc<dyn OutputFileSystem>,
        options: MiddlewareOptions,
    ) -> Result<Self, BuildError> {
        let runtime = Handle::try_current().map_err(|e| BuildError::Watch(e.to_string()))?;
        Self::with_runtime(compiler, fs, options, runtime)
    }

    /// Start watching; gate drains are spawned on `runtime`.
    pub fn with_runtime(
        compiler: &dyn Compiler,
        fs: Arc<dyn OutputFileSystem>,
        options: MiddlewareOptions,
        runtime: Handle,
    ) -> Result<Self, BuildError> {
        let gate = BuildGate::new(runtime);
        let observer: Arc<dyn BuildObserver> = Arc::new(gate.clone());
        let watching = compiler.watch(observer)?;

        Ok(Self {
            inner: Arc::new(Inner {
                pipeline: Pipeline { gate, fs, options },
                watching,
            }),
        })
    }

    pub fn options(&self) -> &MiddlewareOptions {
        &self.inner.pipeline.options
    }

    /// Handle a request with a fresh 200 response as the starting point
    pub async fn handle<B>(&self, req: Request<B>) -> Outcome<B> {
        self.handle_with(req, Response::new(())).await
    }

    /// Handle a request on top of a response prepared by an earlier step.
    ///
    /// Headers already set on `base` win over the ones the pipeline would set.
    pub async fn handle_with<B>(&self, req: Request<B>, base: Response<()>) -> Outcome<B> {
        self.inner.pipeline.process(req, base).await
    }

    /// Run `callback` once a valid build exists (immediately if one does)
    pub fn wait_until_valid<F>(&self, callback: F)
    where
        F: FnOnce(Arc<BuildResult>) + Send + 'static,
    {
        self.inner.pipeline.gate.wait_until_valid(None, callback);
    }

    /// Async form of [`wait_until_valid`](Self::wait_until_valid)
    pub async fn ready(&self) -> Result<Arc<BuildResult>, BuildError> {
        self.inner.pipeline.gate.ready(None).await
    }

    /// Ask the compiler to rebuild, then run `callback` with the next valid
    /// build
    pub fn invalidate<F>(&self, callback: F)
    where
        F: FnOnce(Arc<BuildResult>) + Send + 'static,
    {
        self.inner.watching.invalidate();
        self.inner.pipeline.gate.wait_until_valid(None, callback);
    }

    /// Stop the watch session and report the outcome to `callback`
    pub fn close<F>(&self, callback: F)
    where
        F: FnOnce(Result<(), BuildError>),
    {
        callback(self.inner.watching.close());
    }

    /// Latest build result, if the gate is currently valid
    pub fn latest_result(&self) -> Option<Arc<BuildResult>> {
        self.inner.pipeline.gate.latest()
    }

    /// Resolve `url` against the latest build without serving it.
    ///
    /// `Ok(None)` when nothing matches or no valid build exists yet.
    pub fn get_filename_from_url(&self, url: &str) -> Result<Option<ResolvedArtifact>, ServeError> {
        let Some(result) = self.latest_result() else {
            return Ok(None);
        };
        let pipeline = &self.inner.pipeline;
        let roots = result.output_roots(pipeline.options.public_path.as_deref());
        routing::resolve(&*pipeline.fs, &roots, url, &pipeline.options.index)
    }
}
