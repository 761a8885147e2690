//! Transport Configuration
//!
//! Launch parameters for the flashlight transport.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default upstream server handed to flashlight
pub const DEFAULT_SERVER: &str = "getiantem.org";

/// Default domain flashlight masquerades as
pub const DEFAULT_MASQUERADE: &str = "cdnjs.com";

/// Default time to wait for the transport to accept connections
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 60_000;

/// Default interval between readiness probes
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default time a stopping process gets to exit before it is killed
pub const DEFAULT_STOP_GRACE_MS: u64 = 5_000;

/// Flashlight launch configuration
///
/// Built once (usually by [`crate::config::load_config`]) and handed to the
/// transport, which never mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashlightConfig {
    /// Upstream server passed as `-server`
    pub server_host: String,

    /// Masquerade domain passed as `-masquerade`
    pub masquerade_host: String,

    /// Application config directory; flashlight gets `<dir>/pt/flashlight`
    pub base_config_dir: PathBuf,

    /// Directory containing `pt/flashlight` or the `install/<platform>` trees
    pub install_root: PathBuf,

    /// Extra arguments appended after the fixed flags
    pub extra_args: Vec<String>,

    /// How long `start_client` waits for the transport to come up
    pub readiness_timeout_ms: u64,

    /// Interval between readiness probes
    pub poll_interval_ms: u64,

    /// Grace period between SIGTERM and SIGKILL on stop
    pub stop_grace_ms: u64,

    /// Whether a process that never became ready is stopped before
    /// `start_client` returns its error
    ///
    /// When false the process is left running and the caller must call
    /// `stop_client`.
    pub stop_on_readiness_timeout: bool,
}

impl Default for FlashlightConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER.to_string(),
            masquerade_host: DEFAULT_MASQUERADE.to_string(),
            base_config_dir: default_base_config_dir(),
            install_root: PathBuf::from("."),
            extra_args: Vec::new(),
            readiness_timeout_ms: DEFAULT_READINESS_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            stop_on_readiness_timeout: true,
        }
    }
}

impl FlashlightConfig {
    /// Directory handed to flashlight as `-configDir`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.base_config_dir.join("pt").join("flashlight")
    }

    /// Readiness timeout as a `Duration`
    #[must_use]
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Poll interval as a `Duration`
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Stop grace period as a `Duration`
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Get the default application config directory
///
/// `~/.lantern`, or `./.lantern` when no home directory is known.
#[must_use]
pub fn default_base_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lantern")
}
