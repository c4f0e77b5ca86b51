// Connection handling module
// Serves one accepted TCP connection through the dev middleware

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::handler::Outcome;
use crate::http::{build_404_response, ResponseBody};
use crate::logger;
use crate::middleware::DevMiddleware;

/// Per-connection behaviour taken from `[server]` and `[logging]`
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Whole-connection timeout; zero disables it
    pub timeout: Duration,
    pub access_log: bool,
}

/// Accept a connection and serve it on a spawned task.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    middleware: &DevMiddleware,
    settings: ConnectionSettings,
) {
    if settings.access_log {
        logger::log_connection_accepted(&peer_addr);
    }
    let middleware = middleware.clone();
    tokio::spawn(handle_connection(stream, peer_addr, middleware, settings));
}

/// Handle a single connection.
///
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Serves HTTP/1.1 with keep-alive, one middleware pass per request
/// 3. Applies the connection timeout
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    middleware: DevMiddleware,
    settings: ConnectionSettings,
) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let middleware = middleware.clone();
        async move {
            Ok::<_, Infallible>(serve_request(&middleware, req, peer_addr, settings.access_log).await)
        }
    });

    let mut builder = http1::Builder::new();
    builder.keep_alive(true);
    let conn = builder.serve_connection(io, service);

    if settings.timeout.is_zero() {
        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }
        return;
    }

    match tokio::time::timeout(settings.timeout, conn).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => logger::log_warning(&format!(
            "Connection from {peer_addr} timed out after {} seconds",
            settings.timeout.as_secs()
        )),
    }
}

/// One request: the middleware answers it, or the fallback 404 does
pub async fn serve_request<B>(
    middleware: &DevMiddleware,
    req: Request<B>,
    peer_addr: SocketAddr,
    access_log: bool,
) -> Response<ResponseBody> {
    let method = req.method().clone();
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string);

    let response = match middleware.handle(req).await {
        Outcome::Respond(response) => response,
        Outcome::Next(_) => build_404_response(),
    };

    if access_log {
        logger::log_access(
            &peer_addr,
            method.as_str(),
            &target,
            response.status().as_u16(),
            response.body().size_hint().exact(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::PrebuiltCompiler;
    use crate::config::OutputConfig;
    use crate::fs::MemoryFileSystem;
    use crate::middleware::MiddlewareOptions;
    use hyper::StatusCode;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    #[tokio::test]
    async fn test_serve_request_with_fallback() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/dist/app.js"), "app").unwrap();

        let outputs = vec![OutputConfig {
            name: None,
            path: "/dist".to_string(),
            public_path: None,
        }];
        let compiler = PrebuiltCompiler::new(&outputs, Handle::current());
        let middleware =
            DevMiddleware::new(&compiler, Arc::new(fs), MiddlewareOptions::default()).unwrap();
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let req = Request::get("/app.js").body(()).unwrap();
        let response = serve_request(&middleware, req, peer, true).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().size_hint().exact(), Some(3));

        let req = Request::get("/missing.js").body(()).unwrap();
        let response = serve_request(&middleware, req, peer, false).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
