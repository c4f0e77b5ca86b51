// Configuration module entry point
// Loads the server, logging, middleware and output-root settings

mod types;

use std::net::SocketAddr;

use crate::error::ConfigError;

// Re-export public types
pub use types::{Config, IndexSetting, LoggingConfig, MiddlewareConfig, OutputConfig, ServerConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "devserve";

impl Config {
    /// Load configuration from the default `devserve.toml`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("DEVSERVE").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.connection_timeout", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("middleware.last_modified", false)?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outputs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[outputs]] entry is required".to_string(),
            ));
        }
        if let Some(output) = self.outputs.iter().find(|o| o.path.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "output {:?} has an empty path",
                output.name.as_deref().unwrap_or("<unnamed>")
            )));
        }
        if let IndexSetting::File(name) = &self.middleware.index {
            if name.is_empty() {
                return Err(ConfigError::Invalid("middleware.index is empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Address(format!("{}:{} ({e})", self.server.host, self.server.port)))
    }
}
