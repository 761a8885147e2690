//! PT Supervisor - Pluggable Transport Launcher
//!
//! Runs one pluggable transport as a local client proxy for as long as this
//! process lives. The transport's listen address is printed to stdout once
//! it accepts connections, so a parent process can read it and route
//! traffic through it.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (flashlight, loopback, config from ~/.config/lantern/pt.toml)
//! pt-supervisor
//!
//! # Custom install tree and upstream
//! pt-supervisor --install-root /opt/lantern --server example.org
//!
//! # Pass extra flags straight to the transport executable
//! pt-supervisor -- -debug
//!
//! # Verbose logging
//! RUST_LOG=debug pt-supervisor
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Stop the transport and exit

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use pt_core::{
    create_transport, load_config, load_config_from_path, ConfigOverrides,
    PluggableTransport, SupervisorConfig, TransportKind,
};

/// PT Supervisor - Runs a pluggable transport as a local proxy for lantern
#[derive(Parser, Debug)]
#[command(name = "pt-supervisor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "PT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Transport to run (flashlight, direct)
    #[arg(short = 't', long, value_name = "KIND")]
    transport: Option<TransportKind>,

    /// Upstream server for flashlight
    #[arg(long, value_name = "HOST")]
    server: Option<String>,

    /// Masquerade domain for flashlight
    #[arg(long, value_name = "HOST")]
    masquerade: Option<String>,

    /// Application config directory (flashlight state lives under <DIR>/pt/flashlight)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Root of the install tree holding pt/<platform>/flashlight
    #[arg(long, value_name = "DIR")]
    install_root: Option<PathBuf>,

    /// How long to wait for the transport to accept connections
    #[arg(long, value_name = "MS")]
    readiness_timeout_ms: Option<u64>,

    /// Local address hint; the port is always chosen by the OS
    #[arg(short = 'b', long, default_value = "127.0.0.1:0", value_name = "ADDR")]
    bind: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Extra arguments passed verbatim to the transport executable
    #[arg(last = true, value_name = "ARGS")]
    extra: Vec<String>,
}

impl Args {
    /// CLI values that take priority over file and environment configuration
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new().with_extra_args(self.extra.clone());

        if let Some(kind) = self.transport {
            overrides = overrides.with_transport(kind);
        }
        if let Some(ref server) = self.server {
            overrides = overrides.with_server(server.clone());
        }
        if let Some(ref masquerade) = self.masquerade {
            overrides = overrides.with_masquerade(masquerade.clone());
        }
        if let Some(ref dir) = self.config_dir {
            overrides = overrides.with_config_dir(dir.clone());
        }
        if let Some(ref root) = self.install_root {
            overrides = overrides.with_install_root(root.clone());
        }
        if let Some(ms) = self.readiness_timeout_ms {
            overrides = overrides.with_readiness_timeout_ms(ms);
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("pt_supervisor={level},pt_core={level}"))
    });

    // stdout carries the proxy address, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Load configuration from file and environment, then apply CLI overrides
fn resolve_config(args: &Args) -> Result<SupervisorConfig> {
    let loaded = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    };
    let mut config = loaded.context("Failed to load configuration")?;

    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        transport = %config.transport,
        config_file = ?config.config_file_path,
        "Configuration resolved"
    );
    Ok(config)
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
    }
    Ok(())
}

/// Wait for Ctrl-C
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    info!("Received Ctrl-C, initiating shutdown");
    Ok(())
}

/// Start the transport, report its address, and hold it until shutdown
async fn run(transport: &dyn PluggableTransport, bind: SocketAddr) -> Result<()> {
    info!(transport = transport.name(), bind = %bind, "Starting transport");

    let addr = match transport.start_client(bind).await {
        Ok(addr) => addr,
        Err(e) => {
            // A process left behind by a failed start must not outlive us
            transport.stop_client().await;
            return Err(e).with_context(|| format!("Failed to start {}", transport.name()));
        }
    };

    info!(
        transport = transport.name(),
        addr = %addr,
        encrypted = transport.supplies_encryption(),
        "Transport ready"
    );
    println!("{addr}");

    let result = wait_for_shutdown().await;

    transport.stop_client().await;
    info!(transport = transport.name(), "Transport stopped");
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("PT Supervisor starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let config = resolve_config(&args)?;
    if config.transport == TransportKind::Direct {
        warn!("Direct transport selected, traffic will not be obfuscated");
    }

    let transport = create_transport(config.transport, config.flashlight);
    let result = run(transport.as_ref(), args.bind).await;

    match result {
        Ok(()) => {
            info!("PT supervisor stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "PT supervisor stopped with error");
            Err(e)
        }
    }
}
