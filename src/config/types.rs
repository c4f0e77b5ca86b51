// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub middleware: MiddlewareConfig,
    /// One entry per build unit, searched first to last
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Per-connection timeout in seconds
    pub connection_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Middleware behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct MiddlewareConfig {
    /// `true`, `false` or the index file name
    #[serde(default)]
    pub index: IndexSetting,
    pub last_modified: bool,
    /// Overrides every unit's own public path
    #[serde(default)]
    pub public_path: Option<String>,
}

/// `index` accepts either a switch or a file name
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IndexSetting {
    Enabled(bool),
    File(String),
}

impl Default for IndexSetting {
    fn default() -> Self {
        Self::Enabled(true)
    }
}

/// One build unit's output directory
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub public_path: Option<String>,
}
