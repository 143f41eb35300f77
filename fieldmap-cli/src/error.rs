//! CLI error type.

use std::fmt;

use fieldmap::cache::CacheError;
use fieldmap::config::ConfigError;
use fieldmap::logging::LoggingError;
use fieldmap::render::RenderError;
use fieldmap::session::SessionError;

/// Anything that ends a command with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration or arguments.
    Config(String),
    /// Could not set up logging.
    Logging(String),
    /// Could not open the map or its tile source.
    Session(String),
    /// Could not draw or save the frame.
    Render(String),
    /// Could not start the async runtime.
    Runtime(std::io::Error),
    CacheClear(String),
    CacheStats(String),
}

impl CliError {
    /// Prints the error and exits the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        std::process::exit(1);
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Session(msg) => write!(f, "Failed to open map: {}", msg),
            CliError::Render(msg) => write!(f, "Render failed: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Config(e) => CliError::Config(e.to_string()),
            SessionError::Render(e) => CliError::Render(e.to_string()),
            other => CliError::Session(other.to_string()),
        }
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Session(e.to_string())
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        CliError::Render(e.to_string())
    }
}
