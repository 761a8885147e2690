//! Transport Traits
//!
//! Core trait definition for pluggable transports.
//!
//! A pluggable transport sits between the proxy client and the network. The
//! client asks it for an address to send traffic to (`start_client`) and
//! the transport takes care of whatever obfuscation it implements behind
//! that address.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while driving a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// None of the candidate executables exist in the search directory
    #[error(
        "Executable not found in {} (tried: {})",
        dir.display(),
        names.join(", ")
    )]
    ExecutableNotFound {
        /// Directory that was searched
        dir: PathBuf,
        /// Candidate names, in the order they were tried
        names: Vec<String>,
    },

    /// The OS refused to create the process
    #[error("Failed to spawn {}: {source}", path.display())]
    SpawnFailed {
        /// Executable that could not be started
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The process was started but never accepted connections
    #[error("Unable to start transport: {addr} not accepting connections after {timeout:?}")]
    ReadinessTimeout {
        /// Address that was polled
        addr: SocketAddr,
        /// How long we waited
        timeout: Duration,
    },

    /// The requested mode is not supported by this transport
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    /// A client is already running on this transport instance
    #[error("Transport client already running at {0}")]
    AlreadyRunning(SocketAddr),

    /// No free local port could be obtained
    #[error("Failed to allocate a local port: {0}")]
    PortAllocation(#[source] std::io::Error),
}

/// Pluggable transport contract
///
/// Implementations own at most one client-side session at a time. All
/// methods take `&self` so a transport can be shared behind an `Arc`;
/// implementations serialize their own state transitions.
#[async_trait]
pub trait PluggableTransport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Start the client side of the transport
    ///
    /// `bind_hint` supplies the interface to listen on; the port is chosen
    /// by the transport. Resolves to the address the proxy client should
    /// send traffic to, once that address is accepting connections.
    async fn start_client(&self, bind_hint: SocketAddr) -> Result<SocketAddr, TransportError>;

    /// Stop the client side of the transport
    ///
    /// Best effort, never fails. Safe to call when nothing is running.
    async fn stop_client(&self);

    /// Start the server side of the transport
    async fn start_server(
        &self,
        port: u16,
        give_mode_addr: SocketAddr,
    ) -> Result<(), TransportError>;

    /// Stop the server side of the transport
    async fn stop_server(&self);

    /// Whether traffic through this transport is already encrypted
    fn supplies_encryption(&self) -> bool;
}
