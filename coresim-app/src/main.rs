//! coresim, a 5G core control-plane simulator
//!
//! Synthesizes the signalling behavior of a UE population behind AMF, SMF
//! and PCF network functions, and exposes the resulting events over 3GPP
//! service-based-interface HTTP callbacks.
//!
//! # Usage
//!
//! ```bash
//! coresim -c config/coresim.yaml
//! coresim -c config/coresim.yaml -l debug
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use coresim_app::metrics_server::{metrics_router, METRICS_PORT};
use coresim_app::{oam_router, OamState, SimController};
use coresim_common::config::AppConfig;
use coresim_common::logging::{init_logging, LogLevel};
use coresim_common::Runtime;

/// coresim - 5G Core Control-Plane Simulator
#[derive(Parser, Debug)]
#[command(name = "coresim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulator configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    println!("coresim - 5G Core Control-Plane Simulator");
    println!("=========================================");

    match run(args).await {
        Ok(()) => {
            info!("simulator exited successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("simulator failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Loading configuration from: {}", args.config_file);
    let config = AppConfig::from_yaml_file(&args.config_file)
        .with_context(|| format!("Failed to load configuration file: {}", args.config_file))?;
    info!("running config:\n{}", config.to_yaml().unwrap_or_default());

    let runtime = Runtime::new().context("Failed to initialize runtime")?;
    let controller = Arc::new(SimController::new(config.sbi_port, runtime.clone()));

    if config.init_on_startup {
        info!("bootstraping simulation instance");
        if let Some(profile) = config.net_config.clone() {
            controller
                .configure(profile)
                .await
                .context("could not initialize the simulator on startup")?;
        }
    }

    // OAM interface
    let oam_listener = TcpListener::bind(("0.0.0.0", config.oam_port))
        .await
        .with_context(|| format!("could not bind OAM listener on :{}", config.oam_port))?;
    info!("serving simulation api on :{}", config.oam_port);
    let oam = oam_router(OamState {
        controller: controller.clone(),
        file_profile: config.net_config.clone(),
    });
    tokio::spawn(async move {
        if let Err(e) = axum::serve(oam_listener, oam).await {
            error!("could not serve OAM server: {e}");
        }
    });

    // Prometheus metrics
    let metrics_listener = TcpListener::bind(("0.0.0.0", METRICS_PORT))
        .await
        .with_context(|| format!("could not bind metrics listener on :{METRICS_PORT}"))?;
    info!("starting prometheus metrics server on :{METRICS_PORT}");
    let metrics = metrics_router(runtime.metrics.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics).await {
            error!("could not serve metrics server: {e}");
        }
    });

    wait_for_shutdown().await;
    info!("terminating...");

    Ok(())
}

/// Waits for SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("could not install SIGTERM handler: {e}");
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
