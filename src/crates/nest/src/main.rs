//! nest client application - CLI entry point

use clap::Parser;
use nest::cli::handlers::Context;
use nest::cli::output::{error_response, get_formatter};
use nest::cli::{Cli, Commands};
use nest::{ConfigLoader, CredentialStore, NestConfig};
use std::process::ExitCode;
use tracing::{debug, warn, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let (config, config_error) = match ConfigLoader::new().load().await {
        Ok(config) => (config, None),
        Err(e) => (NestConfig::default(), Some(e)),
    };

    // Initialize logging based on config
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        match config.ui.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = config_error {
        warn!("Failed to load config: {}, using defaults", e);
    }
    debug!("Starting nest version {}", nest::version::VERSION);

    let format = cli.format;
    let command = cli.command.unwrap_or(Commands::Feed {
        category: None,
        pages: 1,
    });
    let context = Context::new(
        config,
        CredentialStore::new(CredentialStore::default_path()),
        format,
    );

    match context.run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "command failed");
            println!("{}", get_formatter(format).format(&error_response(&e.user_message())));
            ExitCode::FAILURE
        }
    }
}
