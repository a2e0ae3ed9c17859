//! CubeFS CSI driver binary
//!
//! Parses flags, initializes logging, and serves the volume lifecycle
//! controller on the plugin's Unix socket.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cubefs_csi::{ControllerService, CsiServer, IdentityService, Result, SystemClock, DRIVER_NAME};

// =============================================================================
// CLI Arguments
// =============================================================================

/// CubeFS CSI Driver - Volume Lifecycle Controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plugin socket path
    #[arg(long, env = "CSI_ENDPOINT", default_value = "/var/run/cubefs/csi.sock")]
    endpoint: PathBuf,

    /// Plugin name reported to the orchestrator
    #[arg(long, env = "DRIVER_NAME", default_value = DRIVER_NAME)]
    driver_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting CubeFS CSI driver");
    info!("  Version: {}", cubefs_csi::VERSION);
    info!("  Driver name: {}", args.driver_name);
    info!("  Endpoint: {}", args.endpoint.display());

    let controller = Arc::new(ControllerService::new(Arc::new(SystemClock)));
    let identity = Arc::new(IdentityService::new(args.driver_name, cubefs_csi::VERSION));

    let server = CsiServer::bind(&args.endpoint, controller, identity)?;
    server.serve().await?;

    info!("Driver shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=info".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
