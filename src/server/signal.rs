// Signal handling module
//
// Supported signals:
// - SIGHUP:  Rebuild (invalidate the current build)
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;

use tokio::sync::Notify;

use crate::logger;
use crate::middleware::DevMiddleware;

/// Signal handler state
pub struct SignalHandler {
    /// Shutdown signal (SIGTERM, SIGINT)
    pub shutdown: Arc<Notify>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Wake the accept loop
    pub fn request_shutdown(&self) {
        // notify_one stores a permit if the loop is not waiting yet
        self.shutdown.notify_one();
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuild on request and log when the new build is being served
pub fn trigger_rebuild(middleware: &DevMiddleware) {
    logger::log_info("Rebuild requested");
    middleware.invalidate(|result| {
        logger::log_info(&format!("Serving rebuilt output ({} units)", result.units.len()));
    });
}

/// Start signal handlers (Unix only)
///
/// | Signal  | Action          |
/// |---------|-----------------|
/// | SIGHUP  | Rebuild         |
/// | SIGTERM | Graceful stop   |
/// | SIGINT  | Graceful stop   |
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>, middleware: DevMiddleware) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let signals = (
            signal(SignalKind::hangup()),
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        );
        let (mut sighup, mut sigterm, mut sigint) = match signals {
            (Ok(hup), Ok(term), Ok(int)) => (hup, term, int),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                logger::log_error(&format!("Failed to register signal handlers: {e}"));
                return;
            }
        };

        logger::log_info(&format!(
            "Signal handlers registered (pid {}): SIGHUP rebuilds, SIGTERM/SIGINT stop",
            std::process::id()
        ));

        loop {
            tokio::select! {
                _ = sighup.recv() => trigger_rebuild(&middleware),

                _ = sigterm.recv() => {
                    logger::log_info("SIGTERM received, shutting down");
                    handler.request_shutdown();
                    break;
                }

                _ = sigint.recv() => {
                    logger::log_info("SIGINT received, shutting down");
                    handler.request_shutdown();
                    break;
                }
            }
        }
    });
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>, _middleware: DevMiddleware) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            logger::log_info("Ctrl+C received, shutting down");
            handler.request_shutdown();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_permit_is_kept() {
        let handler = SignalHandler::new();
        handler.request_shutdown();
        // Notified before anyone waited; the permit still wakes the loop
        handler.shutdown.notified().await;
    }
}
