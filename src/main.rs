use std::sync::Arc;
use std::time::Duration;

use devserve::build::PrebuiltCompiler;
use devserve::config::{self, Config};
use devserve::fs::DiskFileSystem;
use devserve::logger;
use devserve::middleware::{DevMiddleware, MiddlewareOptions};
use devserve::server::{
    create_reusable_listener, start_server_loop, start_signal_handler, ConnectionSettings,
    SignalHandler,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Tokio runtime, worker count from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let compiler = PrebuiltCompiler::new(&cfg.outputs, tokio::runtime::Handle::current());
    let middleware = DevMiddleware::new(
        &compiler,
        Arc::new(DiskFileSystem),
        MiddlewareOptions::from(&cfg.middleware),
    )?;

    logger::log_server_start(&addr, &cfg);

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals), middleware.clone());

    let settings = ConnectionSettings {
        timeout: Duration::from_secs(cfg.server.connection_timeout),
        access_log: cfg.logging.access_log,
    };
    start_server_loop(listener, middleware.clone(), settings, Arc::clone(&signals.shutdown)).await;

    middleware.close(|result| match result {
        Ok(()) => logger::log_info("Watch session closed"),
        Err(e) => logger::log_error(&format!("Failed to close watch session: {e}")),
    });
    Ok(())
}
