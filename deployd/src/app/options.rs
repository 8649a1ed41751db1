//! Application configuration options

use std::time::Duration;

use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Server configuration
    pub server: ServerOptions,

    /// Output phrases that fail a step
    pub failure_phrases: Vec<String>,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            failure_phrases: settings.failure_phrases.clone(),
            max_shutdown_delay: Duration::from_secs(settings.max_shutdown_delay_secs),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}
