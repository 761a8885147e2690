//! Executable Resolver
//!
//! Finds the flashlight installation directory for the host platform and
//! picks the executable inside it.
//!
//! # Layout
//!
//! ```text
//! <root>/pt/flashlight/                        development checkout
//! <root>/install/osx/pt/flashlight/            macOS
//! <root>/install/win/pt/flashlight/            Windows
//! <root>/install/linux_x86_64/pt/flashlight/   64-bit Linux
//! <root>/install/linux_x86_32/pt/flashlight/   everything else
//! ```
//!
//! The development directory wins whenever it exists.

use std::path::{Path, PathBuf};

use crate::transport::TransportError;

/// Candidate executable names, in priority order
pub const FLASHLIGHT_EXECUTABLE_NAMES: [&str; 2] = ["flashlight", "flashlight.exe"];

/// Platform facts used to pick an installation subtree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostInfo {
    /// Operating system name, as in `std::env::consts::OS`
    pub os: String,
    /// CPU architecture, as in `std::env::consts::ARCH`
    pub arch: String,
}

impl HostInfo {
    /// Create host info from explicit values
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Host info for the running process
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

/// Installation subtree for a platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallBucket {
    /// macOS
    Osx,
    /// Windows
    Windows,
    /// 64-bit Linux
    Linux64,
    /// 32-bit Linux, also the fallback for anything unrecognized
    Linux32,
}

impl InstallBucket {
    /// Pick the bucket for a host
    ///
    /// Non-macOS, non-Windows hosts are split on whether the architecture
    /// name mentions `64`.
    #[must_use]
    pub fn for_host(host: &HostInfo) -> Self {
        match host.os.to_lowercase().as_str() {
            "macos" | "darwin" => Self::Osx,
            "windows" => Self::Windows,
            _ if host.arch.contains("64") => Self::Linux64,
            _ => Self::Linux32,
        }
    }

    /// Directory name under `install/`
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Osx => "osx",
            Self::Windows => "win",
            Self::Linux64 => "linux_x86_64",
            Self::Linux32 => "linux_x86_32",
        }
    }
}

/// Locates the directory to search for transport executables
pub trait ExecutableLocator: Send + Sync {
    /// Search directory for the given host
    fn search_path(&self, host: &HostInfo) -> PathBuf;
}

/// Locator for the standard install tree layout
#[derive(Clone, Debug)]
pub struct InstallTreeLocator {
    root: PathBuf,
}

impl InstallTreeLocator {
    /// Create a locator rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExecutableLocator for InstallTreeLocator {
    fn search_path(&self, host: &HostInfo) -> PathBuf {
        resolve_base_path(&self.root, host)
    }
}

/// Resolve the absolute flashlight installation directory
#[must_use]
pub fn resolve_base_path(root: &Path, host: &HostInfo) -> PathBuf {
    let dev = root.join("pt").join("flashlight");
    if dev.is_dir() {
        tracing::debug!(path = ?dev, "Using development flashlight directory");
        return absolute(dev);
    }

    let bucket = InstallBucket::for_host(host);
    absolute(
        root.join("install")
            .join(bucket.dir_name())
            .join("pt")
            .join("flashlight"),
    )
}

/// Find the first candidate that exists as a regular file in `dir`
///
/// # Errors
///
/// Returns `TransportError::ExecutableNotFound` naming the directory and
/// every candidate when none of them exist.
pub fn find_executable(dir: &Path, names: &[&str]) -> Result<PathBuf, TransportError> {
    for name in names {
        let candidate = dir.join(name);
        if candidate.is_file() {
            tracing::debug!(path = ?candidate, "Found transport executable");
            return Ok(candidate);
        }
        tracing::info!(path = ?candidate, "Transport executable not found");
    }

    tracing::error!(dir = ?dir, "Transport executable not found in search path");
    Err(TransportError::ExecutableNotFound {
        dir: dir.to_path_buf(),
        names: names.iter().map(ToString::to_string).collect(),
    })
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
