//! fingerd - WebFinger discovery server
//!
//! Reads the URN alias and resource documents, then answers WebFinger
//! queries until interrupted.

use clap::{Parser, Subcommand};
use fingerd::{telemetry, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serve WebFinger identities from YAML documents.
#[derive(Parser)]
#[command(name = "fingerd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webfinger server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Host to listen on
    #[arg(long, env = "FINGER_HOST", default_value = "localhost")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "FINGER_PORT", default_value_t = 8080)]
    port: u16,

    /// Enable debug logging
    #[arg(long, env = "FINGER_DEBUG")]
    debug: bool,

    /// Path to the URN alias document
    #[arg(long, env = "FINGER_URN_FILE", default_value = "urns.yml")]
    urn_file: PathBuf,

    /// Path to the resource document
    #[arg(long, env = "FINGER_FINGER_FILE", default_value = "fingers.yml")]
    finger_file: PathBuf,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, env = "FINGER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    shutdown_timeout_secs: u64,
}

impl From<ServeArgs> for Config {
    fn from(args: ServeArgs) -> Self {
        Config {
            host: args.host,
            port: args.port,
            debug: args.debug,
            urn_path: args.urn_file,
            finger_path: args.finger_file,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let Commands::Serve(args) = cli.command;
    let config = Config::from(args);

    telemetry::init(config.debug);
    info!("Starting fingerd...");
    info!("Listen address: {}", config.addr());
    info!("URN file: {:?}", config.urn_path);
    info!("Finger file: {:?}", config.finger_path);

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match fingerd::run(&config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fingerd exited with an error");
            eprintln!("fingerd: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    token.cancel();
}
