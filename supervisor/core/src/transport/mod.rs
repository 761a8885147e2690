//! Pluggable Transports
//!
//! Provides the transport contract and its implementations:
//! - `Flashlight`: runs the external flashlight executable (client only)
//! - `DirectTransport`: no transport, traffic goes straight through
//!
//! # Design Philosophy
//!
//! The proxy client only ever sees `PluggableTransport`. Which transport is
//! behind it, and whether that involves an external process, is decided by
//! configuration through [`create_transport`].

pub mod config;
pub mod direct;
pub mod factory;
pub mod flashlight;
pub mod traits;

// Re-exports for convenience
pub use config::FlashlightConfig;
pub use direct::DirectTransport;
pub use factory::{create_transport, TransportKind, UnknownTransport};
pub use flashlight::{Flashlight, TransportState};
pub use traits::{PluggableTransport, TransportError};
