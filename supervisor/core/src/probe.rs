//! Local Network Probes
//!
//! The two network facts the supervisor needs from the host:
//! - a free local port to hand to the transport (`PortAllocator`)
//! - whether something is accepting TCP connections at an address (`LivenessProber`)

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

/// Supplies unused local TCP ports
#[async_trait]
pub trait PortAllocator: Send + Sync {
    /// Find a port that is currently free on `ip`
    async fn allocate(&self, ip: IpAddr) -> io::Result<u16>;
}

/// Port allocator that lets the OS pick an ephemeral port
///
/// Binds port 0, reads back the assigned port and releases it. The port is
/// free at the time of the call; another process can still take it before
/// the transport binds.
#[derive(Clone, Copy, Debug, Default)]
pub struct EphemeralPortAllocator;

#[async_trait]
impl PortAllocator for EphemeralPortAllocator {
    async fn allocate(&self, ip: IpAddr) -> io::Result<u16> {
        let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await?;
        let port = listener.local_addr()?.port();
        tracing::debug!(ip = %ip, port, "Allocated local port");
        Ok(port)
    }
}

/// Checks whether a TCP listener is accepting connections
#[async_trait]
pub trait LivenessProber: Send + Sync {
    /// Attempt one connection to `addr`, giving up after `timeout`
    async fn is_listening(&self, addr: SocketAddr, timeout: Duration) -> bool;
}

/// Prober that opens (and immediately drops) a TCP connection
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpProber;

#[async_trait]
impl LivenessProber for TcpProber {
    async fn is_listening(&self, addr: SocketAddr, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::trace!(addr = %addr, error = %e, "Probe connection failed");
                false
            }
            Err(_) => {
                tracing::trace!(addr = %addr, "Probe connection timed out");
                false
            }
        }
    }
}
