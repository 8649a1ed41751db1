//! deployd - Entry Point
//!
//! Serves the deployment job API on a local HTTP socket.

use std::collections::HashMap;
use std::env;

use deployd::app::options::AppOptions;
use deployd::app::run::run;
use deployd::filesys::file::File;
use deployd::logs::{init_logging, LogLevel, LogOptions};
use deployd::storage::layout::StorageLayout;
use deployd::storage::settings::Settings;
use deployd::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        let version = version_info();
        println!("{} {}", version.name, version.version);
        return;
    }

    // Retrieve the settings file
    let settings_file = match cli_args.get("settings") {
        Some(path) => File::new(path),
        None => StorageLayout::default().settings_file(),
    };
    let mut settings = match settings_file.read_json_or_default::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {e}",
                settings_file.path().display()
            );
            std::process::exit(2);
        }
    };
    if let Err(e) = apply_overrides(&mut settings, &cli_args) {
        eprintln!("{e}");
        std::process::exit(2);
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
        log_dir: settings.log_dir.clone(),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from(&settings);
    info!("Running deployd with options: {:?}", options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run deployd: {e}");
        std::process::exit(1);
    }
}

fn apply_overrides(
    settings: &mut Settings,
    cli_args: &HashMap<String, String>,
) -> Result<(), String> {
    if let Some(host) = cli_args.get("host") {
        settings.server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port") {
        settings.server.port = port
            .parse()
            .map_err(|_| format!("Invalid port: {}", port))?;
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level.parse::<LogLevel>()?;
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
