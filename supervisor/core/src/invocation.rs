//! Invocation Builder
//!
//! Assembles the command line for one flashlight launch:
//!
//! ```text
//! <executable> -server <server> -masquerade <masquerade> -configDir <dir> -addr <host:port> [extra...]
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::transport::FlashlightConfig;

/// Flag carrying the upstream server
pub const SERVER_FLAG: &str = "-server";
/// Flag carrying the masquerade domain
pub const MASQUERADE_FLAG: &str = "-masquerade";
/// Flag carrying the transport's config directory
pub const CONFIG_DIR_FLAG: &str = "-configDir";
/// Flag carrying the local listen address
pub const ADDRESS_FLAG: &str = "-addr";

/// Program plus argument vector for a single launch
///
/// Arguments are OS strings so paths reach the process byte for byte, even
/// when they are not valid UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    /// Create an invocation with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument unchanged
    #[must_use]
    pub fn arg(mut self, value: impl AsRef<OsStr>) -> Self {
        self.args.push(value.as_ref().to_os_string());
        self
    }

    /// Append one argument, using its `Display` form
    #[must_use]
    pub fn display_arg(self, value: impl fmt::Display) -> Self {
        self.arg(value.to_string())
    }

    /// Executable to run
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, in order
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the flashlight command line
///
/// Pure: the same inputs always produce the same invocation.
pub fn build<I, T>(
    config: &FlashlightConfig,
    program: impl Into<PathBuf>,
    addr: SocketAddr,
    extra: I,
) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    let invocation = Invocation::new(program)
        .arg(SERVER_FLAG)
        .arg(&config.server_host)
        .arg(MASQUERADE_FLAG)
        .arg(&config.masquerade_host)
        .arg(CONFIG_DIR_FLAG)
        .arg(config.config_dir())
        .arg(ADDRESS_FLAG)
        .display_arg(addr);

    extra
        .into_iter()
        .fold(invocation, |invocation, value| invocation.display_arg(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> FlashlightConfig {
        FlashlightConfig {
            server_host: "getiantem.org".into(),
            masquerade_host: "cdnjs.com".into(),
            base_config_dir: PathBuf::from("/home/user/.lantern"),
            ..Default::default()
        }
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:10080".parse().unwrap()
    }

    #[test]
    fn test_build_fixed_flags() {
        let config = config();
        let invocation = build(&config, "/opt/flashlight", addr(), Vec::<String>::new());

        assert_eq!(invocation.program(), Path::new("/opt/flashlight"));
        assert_eq!(
            &invocation.args()[..5],
            &["-server", "getiantem.org", "-masquerade", "cdnjs.com", "-configDir"]
        );
        assert_eq!(invocation.args()[5], config.config_dir().into_os_string());
        assert_eq!(&invocation.args()[6..], &["-addr", "127.0.0.1:10080"]);
    }

    #[test]
    fn test_build_appends_extra_in_order() {
        let invocation = build(&config(), "flashlight", addr(), ["-debug", "-v"]);
        let args = invocation.args();

        assert_eq!(&args[8..], &["-debug", "-v"]);
        assert_eq!(args[6], "-addr");
    }

    #[test]
    fn test_build_stringifies_extra_losslessly() {
        let invocation = build(
            &config(),
            "flashlight",
            addr(),
            [1.000_000_1_f64.to_string(), u64::MAX.to_string()],
        );

        assert_eq!(&invocation.args()[8..], &["1.0000001", "18446744073709551615"]);
    }

    #[test]
    fn test_build_is_pure() {
        let config = config();
        let first = build(&config, "flashlight", addr(), ["-x"]);
        let second = build(&config, "flashlight", addr(), ["-x"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_ipv6_address() {
        let addr: SocketAddr = "[::1]:9000".parse().unwrap();
        let invocation = build(&config(), "flashlight", addr, Vec::<String>::new());
        assert_eq!(invocation.args()[7], "[::1]:9000");
    }

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("/bin/flashlight")
            .arg("-addr")
            .display_arg(addr());
        assert_eq!(invocation.to_string(), "/bin/flashlight -addr 127.0.0.1:10080");
    }

    #[cfg(unix)]
    #[test]
    fn test_build_keeps_non_utf8_config_dir() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let config = FlashlightConfig {
            base_config_dir: PathBuf::from(OsStr::from_bytes(b"/home/\xffuser/.lantern")),
            ..config()
        };
        let invocation = build(&config, "flashlight", addr(), Vec::<String>::new());

        let passed = invocation.args()[5].clone().into_vec();
        assert_eq!(passed, config.config_dir().into_os_string().into_vec());
        assert!(passed.contains(&0xff));
    }
}
