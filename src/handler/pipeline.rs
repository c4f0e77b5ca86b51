//! Request pipeline
//!
//! One pass per request: await the build, resolve the artifact, set the
//! validators, answer conditional requests, negotiate the range and stream.

use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE,
    ETAG, LAST_MODIFIED, RANGE,
};
use hyper::{Method, Request, Response, StatusCode};

use crate::build::{BuildGate, BuildResult};
use crate::error::ServeError;
use crate::fs::OutputFileSystem;
use crate::http::response::{empty_body, strip_content_headers};
use crate::http::{
    build_error_response, cache, mime, negotiate, ArtifactBody, Conditional, RangeOutcome,
    ResponseBody,
};
use crate::logger;
use crate::middleware::MiddlewareOptions;
use crate::routing::{self, ResolvedArtifact};

/// What the pipeline did with a request
pub enum Outcome<B> {
    /// The pipeline answered the request
    Respond(Response<ResponseBody>),
    /// Not ours: hand the request to the next step. The current
    /// `Arc<BuildResult>` is attached to its extensions.
    Next(Request<B>),
}

impl<B> Outcome<B> {
    pub const fn is_next(&self) -> bool {
        matches!(self, Self::Next(_))
    }

    /// The response, if the pipeline answered
    pub fn into_response(self) -> Option<Response<ResponseBody>> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Next(_) => None,
        }
    }
}

/// Everything a request needs, shared by all requests
pub struct Pipeline {
    pub gate: BuildGate,
    pub fs: Arc<dyn OutputFileSystem>,
    pub options: MiddlewareOptions,
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: impl FnOnce() -> Option<String>) {
    if headers.contains_key(&name) {
        return;
    }
    if let Some(value) = value().and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(name, value);
    }
}

fn error_page(err: &ServeError) -> Response<ResponseBody> {
    build_error_response(err.status(), HeaderMap::new())
}

fn is_cacheable(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_MODIFIED
}

impl Pipeline {
    /// Run the pipeline over `req`, starting from `base` (status and headers
    /// set by earlier steps; headers already present are not overridden).
    pub async fn process<B>(&self, req: Request<B>, base: Response<()>) -> Outcome<B> {
        let result = {
            let name = req.uri().path_and_query().map(|p| p.as_str());
            match self.gate.ready(name).await {
                Ok(result) => result,
                Err(err) => {
                    logger::log_error(&format!("Build gate unavailable: {err}"));
                    return Outcome::Respond(build_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        HeaderMap::new(),
                    ));
                }
            }
        };

        let method = req.method().clone();
        if method != Method::GET && method != Method::HEAD {
            return pass_through(req, result);
        }

        let roots = result.output_roots(self.options.public_path.as_deref());
        let artifact = match routing::resolve(&*self.fs, &roots, req.uri().path(), &self.options.index) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return pass_through(req, result),
            Err(err) => return Outcome::Respond(error_page(&err)),
        };

        let (mut parts, ()) = base.into_parts();
        self.set_validators(&mut parts.headers, &artifact);

        let etag = header_string(&parts.headers, &ETAG);
        let last_modified = header_string(&parts.headers, &LAST_MODIFIED);
        let conditional = Conditional::new(req.headers());

        if conditional.is_conditional() {
            if conditional.is_precondition_failure(etag.as_deref(), last_modified.as_deref()) {
                return Outcome::Respond(error_page(&ServeError::PreconditionFailed));
            }

            if parts.status == StatusCode::NOT_FOUND {
                parts.status = StatusCode::OK;
            }

            if is_cacheable(parts.status)
                && conditional.is_fresh(etag.as_deref(), last_modified.as_deref())
            {
                parts.status = StatusCode::NOT_MODIFIED;
                strip_content_headers(&mut parts.headers);
                return Outcome::Respond(Response::from_parts(parts, empty_body()));
            }
        }

        let size = artifact.size;
        let range_header = req.headers().get(RANGE).and_then(|v| v.to_str().ok());
        let range_fresh = conditional.is_range_fresh(etag.as_deref(), last_modified.as_deref());
        let outcome = negotiate(range_header, size, range_fresh);

        match outcome {
            RangeOutcome::Unsatisfiable => {
                let err = ServeError::RangeNotSatisfiable { size };
                let mut extra = HeaderMap::new();
                set_header(&mut extra, CONTENT_RANGE, &format!("bytes */{size}"));
                return Outcome::Respond(build_error_response(err.status(), extra));
            }
            RangeOutcome::Single(range) => {
                parts.status = StatusCode::PARTIAL_CONTENT;
                set_header(&mut parts.headers, CONTENT_RANGE, &range.content_range(size));
            }
            RangeOutcome::Full | RangeOutcome::Ignored(_) => {}
        }

        let window = outcome.window(size);
        let (start, end) = window.bounds();
        let reader = match self.fs.open_range(&artifact.path, start, end).await {
            Ok(reader) => reader,
            Err(err) => {
                let err = ServeError::from_io(err);
                if let ServeError::Stream(ref io) = err {
                    logger::log_stream_error(io);
                }
                return Outcome::Respond(error_page(&err));
            }
        };

        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(window.len));

        if method == Method::HEAD {
            if parts.status == StatusCode::NOT_FOUND {
                parts.status = StatusCode::OK;
            }
            return Outcome::Respond(Response::from_parts(parts, empty_body()));
        }

        let body = ArtifactBody::new(reader, window.len).boxed_unsync();
        Outcome::Respond(Response::from_parts(parts, body))
    }

    /// `Content-Type`, `Accept-Ranges`, `ETag` and (optionally)
    /// `Last-Modified`, each only if an earlier step left it unset
    fn set_validators(&self, headers: &mut HeaderMap, artifact: &ResolvedArtifact) {
        set_if_absent(headers, CONTENT_TYPE, || {
            mime::content_type(&artifact.path.to_string_lossy())
        });
        set_if_absent(headers, ACCEPT_RANGES, || Some("bytes".to_string()));
        set_if_absent(headers, ETAG, || {
            Some(cache::generate_etag(artifact.size, artifact.mtime))
        });
        if self.options.last_modified {
            set_if_absent(headers, LAST_MODIFIED, || {
                Some(cache::format_http_date(artifact.mtime))
            });
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn pass_through<B>(mut req: Request<B>, result: Arc<BuildResult>) -> Outcome<B> {
    req.extensions_mut().insert(result);
    Outcome::Next(req)
}
