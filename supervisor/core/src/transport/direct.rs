//! Direct Transport
//!
//! The "no pluggable transport" variant: traffic goes straight to the bind
//! hint, nothing is spawned and nothing is encrypted by the transport.

use std::net::SocketAddr;

use async_trait::async_trait;

use super::traits::{PluggableTransport, TransportError};

/// Pass-through transport
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectTransport;

impl DirectTransport {
    /// Create a pass-through transport
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluggableTransport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn start_client(&self, bind_hint: SocketAddr) -> Result<SocketAddr, TransportError> {
        tracing::debug!(addr = %bind_hint, "Direct transport, using address as-is");
        Ok(bind_hint)
    }

    async fn stop_client(&self) {}

    async fn start_server(
        &self,
        port: u16,
        give_mode_addr: SocketAddr,
    ) -> Result<(), TransportError> {
        tracing::debug!(port, addr = %give_mode_addr, "Direct transport server is a no-op");
        Ok(())
    }

    async fn stop_server(&self) {}

    fn supplies_encryption(&self) -> bool {
        false
    }
}
