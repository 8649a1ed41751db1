//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::deploy::classifier::DEFAULT_FAILURE_PHRASES;
use crate::logs::LogLevel;

/// Runner settings, read from `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerSettings,

    /// Output phrases that fail a step regardless of its exit code
    #[serde(default = "default_failure_phrases")]
    pub failure_phrases: Vec<String>,

    #[serde(default = "default_max_shutdown_delay_secs")]
    pub max_shutdown_delay_secs: u64,
}

fn default_failure_phrases() -> Vec<String> {
    DEFAULT_FAILURE_PHRASES.iter().map(|p| p.to_string()).collect()
}

fn default_max_shutdown_delay_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            failure_phrases: default_failure_phrases(),
            max_shutdown_delay_secs: default_max_shutdown_delay_secs(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
