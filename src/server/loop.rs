// Server loop module
// Accepts connections until shutdown is signalled

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::{accept_connection, ConnectionSettings};
use crate::logger;
use crate::middleware::DevMiddleware;

/// Accept connections on `listener` until `shutdown` fires.
///
/// Connections already accepted keep running on their own tasks.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    middleware: DevMiddleware,
    settings: ConnectionSettings,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &middleware, settings);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            _ = shutdown.notified() => {
                logger::log_info("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }
}
