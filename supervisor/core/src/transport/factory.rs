//! Transport Factory
//!
//! Creates transport instances from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::FlashlightConfig;
use super::direct::DirectTransport;
use super::flashlight::Flashlight;
use super::traits::PluggableTransport;

/// Which transport to run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Standalone flashlight executable (client only)
    #[default]
    Flashlight,
    /// No transport, connect directly
    Direct,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flashlight => write!(f, "flashlight"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// Error returned when parsing an unknown transport name
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown transport '{0}' (expected 'flashlight' or 'direct')")]
pub struct UnknownTransport(pub String);

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flashlight" => Ok(Self::Flashlight),
            "direct" | "none" => Ok(Self::Direct),
            _ => Err(UnknownTransport(s.to_string())),
        }
    }
}

/// Create a transport of the given kind
///
/// # Example
///
/// ```ignore
/// use pt_core::transport::{create_transport, FlashlightConfig, TransportKind};
///
/// let transport = create_transport(TransportKind::Flashlight, FlashlightConfig::default());
/// let addr = transport.start_client("127.0.0.1:0".parse()?).await?;
/// ```
#[must_use]
pub fn create_transport(
    kind: TransportKind,
    config: FlashlightConfig,
) -> Box<dyn PluggableTransport> {
    match kind {
        TransportKind::Flashlight => Box::new(Flashlight::new(config)),
        TransportKind::Direct => Box::new(DirectTransport::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transport_kind() {
        assert_eq!("flashlight".parse(), Ok(TransportKind::Flashlight));
        assert_eq!("Flashlight ".parse(), Ok(TransportKind::Flashlight));
        assert_eq!("direct".parse(), Ok(TransportKind::Direct));
        assert_eq!("none".parse(), Ok(TransportKind::Direct));
    }

    #[test]
    fn test_parse_unknown_transport() {
        let err = "fteproxy".parse::<TransportKind>().unwrap_err();
        assert_eq!(err, UnknownTransport("fteproxy".into()));
        assert!(err.to_string().contains("fteproxy"));
    }

    #[test]
    fn test_transport_kind_display_round_trip() {
        for kind in [TransportKind::Flashlight, TransportKind::Direct] {
            assert_eq!(kind.to_string().parse(), Ok(kind));
        }
    }

    #[test]
    fn test_create_flashlight() {
        let transport = create_transport(TransportKind::Flashlight, FlashlightConfig::default());
        assert_eq!(transport.name(), "flashlight");
        assert!(transport.supplies_encryption());
    }

    #[test]
    fn test_create_direct() {
        let transport = create_transport(TransportKind::Direct, FlashlightConfig::default());
        assert_eq!(transport.name(), "direct");
        assert!(!transport.supplies_encryption());
    }
}
