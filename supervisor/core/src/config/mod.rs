//! TOML Configuration File Support
//!
//! This module provides centralized configuration loading for the transport
//! supervisor, supporting a TOML configuration file at
//! `~/.config/lantern/pt.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! transport = "flashlight"
//!
//! [flashlight]
//! server = "getiantem.org"
//! masquerade = "cdnjs.com"
//! config_dir = "/home/user/.lantern"
//! install_root = "/opt/lantern"
//! extra_args = ["-debug"]
//!
//! [launch]
//! readiness_timeout_ms = 60000
//! poll_interval_ms = 100
//! stop_grace_ms = 5000
//! stop_on_readiness_timeout = true
//! ```
//!
//! # Environment Variables
//!
//! - `PT_TRANSPORT`: "flashlight" or "direct"
//! - `PT_FLASHLIGHT_SERVER`, `PT_FLASHLIGHT_MASQUERADE`
//! - `PT_CONFIG_DIR`, `PT_INSTALL_ROOT`
//! - `PT_READINESS_TIMEOUT`, `PT_POLL_INTERVAL`, `PT_STOP_GRACE` (milliseconds)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{FlashlightConfig, TransportKind};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Flashlight section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashlightToml {
    /// Upstream server
    pub server: Option<String>,

    /// Masquerade domain
    pub masquerade: Option<String>,

    /// Application config directory
    pub config_dir: Option<PathBuf>,

    /// Root of the install tree
    pub install_root: Option<PathBuf>,

    /// Extra arguments for the executable
    pub extra_args: Option<Vec<String>>,
}

/// Launch section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchToml {
    /// Readiness timeout in milliseconds
    pub readiness_timeout_ms: Option<u64>,

    /// Readiness poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Grace period between SIGTERM and SIGKILL in milliseconds
    pub stop_grace_ms: Option<u64>,

    /// Stop a process that never became ready
    pub stop_on_readiness_timeout: Option<bool>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorToml {
    /// Transport to run
    pub transport: Option<TransportKind>,

    /// Flashlight configuration section
    pub flashlight: FlashlightToml,

    /// Launch configuration section
    pub launch: LaunchToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the supervisor
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Transport to run
    pub transport: TransportKind,

    /// Flashlight launch configuration
    pub flashlight: FlashlightConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            flashlight: FlashlightConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl SupervisorConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make a launch meaningless
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let flashlight = &self.flashlight;

        if flashlight.server_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "flashlight server must not be empty".into(),
            ));
        }
        if flashlight.masquerade_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "flashlight masquerade must not be empty".into(),
            ));
        }
        if flashlight.readiness_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "readiness_timeout_ms must be greater than zero".into(),
            ));
        }
        if flashlight.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if flashlight.poll_interval_ms > flashlight.readiness_timeout_ms {
            return Err(ConfigError::ValidationError(format!(
                "poll_interval_ms ({}) exceeds readiness_timeout_ms ({})",
                flashlight.poll_interval_ms, flashlight.readiness_timeout_ms
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/lantern/pt.toml` or
/// `~/.config/lantern/pt.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lantern").join("pt.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<SupervisorConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<SupervisorConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(
    path: Option<PathBuf>,
    env: F,
) -> Result<SupervisorConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = SupervisorConfig::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: SupervisorToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env)?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut SupervisorConfig, toml: &SupervisorToml) {
    if let Some(kind) = toml.transport {
        config.transport = kind;
    }

    // Flashlight settings
    let flashlight = &mut config.flashlight;
    if let Some(ref server) = toml.flashlight.server {
        flashlight.server_host.clone_from(server);
    }
    if let Some(ref masquerade) = toml.flashlight.masquerade {
        flashlight.masquerade_host.clone_from(masquerade);
    }
    if let Some(ref dir) = toml.flashlight.config_dir {
        flashlight.base_config_dir.clone_from(dir);
    }
    if let Some(ref root) = toml.flashlight.install_root {
        flashlight.install_root.clone_from(root);
    }
    if let Some(ref extra) = toml.flashlight.extra_args {
        flashlight.extra_args.clone_from(extra);
    }

    // Launch settings
    if let Some(timeout) = toml.launch.readiness_timeout_ms {
        flashlight.readiness_timeout_ms = timeout;
    }
    if let Some(interval) = toml.launch.poll_interval_ms {
        flashlight.poll_interval_ms = interval;
    }
    if let Some(grace) = toml.launch.stop_grace_ms {
        flashlight.stop_grace_ms = grace;
    }
    if let Some(stop) = toml.launch.stop_on_readiness_timeout {
        flashlight.stop_on_readiness_timeout = stop;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut SupervisorConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(kind) = env("PT_TRANSPORT") {
        config.transport = kind
            .parse()
            .map_err(|e: crate::transport::UnknownTransport| {
                ConfigError::ValidationError(e.to_string())
            })?;
        config.source = ConfigSource::Env;
    }

    let flashlight = &mut config.flashlight;
    let mut touched = false;

    if let Some(server) = env("PT_FLASHLIGHT_SERVER") {
        flashlight.server_host = server;
        touched = true;
    }
    if let Some(masquerade) = env("PT_FLASHLIGHT_MASQUERADE") {
        flashlight.masquerade_host = masquerade;
        touched = true;
    }
    if let Some(dir) = env("PT_CONFIG_DIR") {
        flashlight.base_config_dir = PathBuf::from(dir);
        touched = true;
    }
    if let Some(root) = env("PT_INSTALL_ROOT") {
        flashlight.install_root = PathBuf::from(root);
        touched = true;
    }
    if let Some(ms) = env("PT_READINESS_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        flashlight.readiness_timeout_ms = ms;
        touched = true;
    }
    if let Some(ms) = env("PT_POLL_INTERVAL").and_then(|v| v.parse::<u64>().ok()) {
        flashlight.poll_interval_ms = ms;
        touched = true;
    }
    if let Some(ms) = env("PT_STOP_GRACE").and_then(|v| v.parse::<u64>().ok()) {
        flashlight.stop_grace_ms = ms;
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Transport override
    pub transport: Option<TransportKind>,

    /// Upstream server override
    pub server: Option<String>,

    /// Masquerade domain override
    pub masquerade: Option<String>,

    /// Config directory override
    pub config_dir: Option<PathBuf>,

    /// Install root override
    pub install_root: Option<PathBuf>,

    /// Readiness timeout override (milliseconds)
    pub readiness_timeout_ms: Option<u64>,

    /// Extra executable arguments, appended after any configured ones
    pub extra_args: Vec<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set transport override
    #[must_use]
    pub fn with_transport(mut self, kind: TransportKind) -> Self {
        self.transport = Some(kind);
        self
    }

    /// Set upstream server override
    #[must_use]
    pub fn with_server(mut self, server: String) -> Self {
        self.server = Some(server);
        self
    }

    /// Set masquerade domain override
    #[must_use]
    pub fn with_masquerade(mut self, masquerade: String) -> Self {
        self.masquerade = Some(masquerade);
        self
    }

    /// Set config directory override
    #[must_use]
    pub fn with_config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    /// Set install root override
    #[must_use]
    pub fn with_install_root(mut self, root: PathBuf) -> Self {
        self.install_root = Some(root);
        self
    }

    /// Set readiness timeout override
    #[must_use]
    pub fn with_readiness_timeout_ms(mut self, ms: u64) -> Self {
        self.readiness_timeout_ms = Some(ms);
        self
    }

    /// Add extra executable arguments
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut SupervisorConfig) {
        if self.transport.is_some()
            || self.server.is_some()
            || self.masquerade.is_some()
            || self.config_dir.is_some()
            || self.install_root.is_some()
            || self.readiness_timeout_ms.is_some()
            || !self.extra_args.is_empty()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(kind) = self.transport {
            config.transport = kind;
        }

        let flashlight = &mut config.flashlight;
        if let Some(ref server) = self.server {
            flashlight.server_host.clone_from(server);
        }
        if let Some(ref masquerade) = self.masquerade {
            flashlight.masquerade_host.clone_from(masquerade);
        }
        if let Some(ref dir) = self.config_dir {
            flashlight.base_config_dir.clone_from(dir);
        }
        if let Some(ref root) = self.install_root {
            flashlight.install_root.clone_from(root);
        }
        if let Some(ms) = self.readiness_timeout_ms {
            flashlight.readiness_timeout_ms = ms;
        }
        flashlight.extra_args.extend(self.extra_args.iter().cloned());
    }
}

// =============================================================================
// Tests
// =============================================================================
