//! Logger module
//!
//! Provides logging utilities for the dev server including:
//! - Server lifecycle logging
//! - Build gate transitions (rebuild started/finished, parked requests)
//! - Security and range-negotiation events
//! - Access logging

pub mod writer;

use std::net::SocketAddr;

use crate::config::Config;

const ACCESS_TARGET: &str = "devserve::access";

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(&config.logging)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Dev server started, listening on http://{addr}");
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    for output in &config.outputs {
        tracing::info!(
            "Serving {} at {}",
            output.path,
            output.public_path.as_deref().unwrap_or("/")
        );
    }
    if let Some(ref path) = config.logging.access_log_file {
        tracing::info!("Access log: {path}");
    }
    if let Some(ref path) = config.logging.error_log_file {
        tracing::info!("Error log: {path}");
    }
}

pub fn log_wait_until_valid(name: Option<&str>) {
    match name {
        Some(name) if !name.is_empty() => tracing::info!("wait until bundle finished: {name}"),
        _ => tracing::info!("wait until bundle finished"),
    }
}

pub fn log_compilation_starting() {
    tracing::info!("Compilation starting...");
}

pub fn log_compilation_finished() {
    tracing::info!("Compilation finished");
}

pub fn log_malicious_path(path: &str) {
    tracing::error!("Malicious path \"{path}\".");
}

pub fn log_null_byte_path(path: &str) {
    tracing::error!("Rejected path with null byte \"{}\".", path.escape_debug());
}

pub fn log_unsatisfiable_range() {
    tracing::warn!("Unsatisfiable range for 'Range' header.");
}

pub fn log_malformed_range() {
    tracing::warn!(
        "A malformed 'Range' header was provided. A regular response will be sent for this request."
    );
}

pub fn log_multiple_ranges() {
    tracing::warn!(
        "A 'Range' header with multiple ranges was provided. Multiple ranges are not supported, so a regular response will be sent for this request."
    );
}

pub fn log_stream_error(err: &std::io::Error) {
    tracing::error!("Failed to stream artifact: {err}");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_access(peer_addr: &SocketAddr, method: &str, path: &str, status: u16, length: Option<u64>) {
    let length = length.map_or_else(|| "-".to_string(), |l| l.to_string());
    tracing::info!(target: ACCESS_TARGET, "{peer_addr} \"{method} {path}\" {status} {length}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_info(message: &str) {
    tracing::info!("{message}");
}

/// Collect everything logged while `f` runs, for assertions in tests
#[cfg(test)]
pub(crate) fn capture<F: FnOnce()>(f: F) -> String {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buf = Capture(Arc::new(Mutex::new(Vec::new())));
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buf.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}
