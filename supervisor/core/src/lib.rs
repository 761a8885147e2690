//! PT Core - Pluggable Transport Supervision for lantern
//!
//! This crate launches an external pluggable-transport executable as a local
//! client proxy, waits for it to accept connections, and tears it down again.
//! It has no opinion about what sits in front of the transport: a daemon, a
//! desktop shell or a test harness can drive it the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Embedding Process                         │
//! │          (pt-supervisor daemon, desktop client, tests)            │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ start_client / stop_client
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                            PT CORE                                │
//! │  ┌────────────────────────────┴───────────────────────────────┐  │
//! │  │              PluggableTransport (Flashlight)                │  │
//! │  │  ┌──────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐ │  │
//! │  │  │ Resolver │  │ Invocation │  │Supervisor │  │Readiness │ │  │
//! │  │  │ (where)  │  │  (argv)    │  │ (process) │  │  (TCP)   │ │  │
//! │  │  └──────────┘  └────────────┘  └─────┬─────┘  └──────────┘ │  │
//! │  └──────────────────────────────────────┼─────────────────────┘  │
//! └─────────────────────────────────────────┼────────────────────────┘
//!                                           │ spawn, SIGTERM/SIGKILL
//!                                  ┌────────┴────────┐
//!                                  │   flashlight    │
//!                                  │  -addr ip:port  │
//!                                  └─────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`PluggableTransport`]: The transport contract (client and server halves)
//! - [`Flashlight`]: Client-only transport backed by the flashlight executable
//! - [`FlashlightConfig`]: Launch parameters for flashlight
//! - [`ProcessSupervisor`]: Spawns and terminates the transport process
//! - [`ReadinessGate`]: Waits for the transport to accept connections
//! - [`SupervisorConfig`]: Layered configuration (file, environment, CLI)
//!
//! # Quick Start
//!
//! ```ignore
//! use pt_core::{Flashlight, FlashlightConfig, PluggableTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let flashlight = Flashlight::new(FlashlightConfig::default());
//!
//!     // Launch on a free loopback port
//!     let addr = flashlight.start_client("127.0.0.1:0".parse()?).await?;
//!     println!("SOCKS/HTTP proxy at {addr}");
//!
//!     tokio::signal::ctrl_c().await?;
//!     flashlight.stop_client().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod invocation;
pub mod probe;
pub mod readiness;
pub mod resolver;
pub mod supervisor;
pub mod transport;

// Re-exports for convenience
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, SupervisorConfig,
};
pub use invocation::Invocation;
pub use probe::{EphemeralPortAllocator, LivenessProber, PortAllocator, TcpProber};
pub use readiness::ReadinessGate;
pub use resolver::{ExecutableLocator, HostInfo, InstallBucket, InstallTreeLocator};
pub use supervisor::{ProcessHandle, ProcessState, ProcessSupervisor};
pub use transport::{
    create_transport, DirectTransport, Flashlight, FlashlightConfig, PluggableTransport,
    TransportError, TransportKind, TransportState, UnknownTransport,
};
