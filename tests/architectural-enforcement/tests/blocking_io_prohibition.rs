//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Process and network I/O in the supervisor crates MUST go
//! through tokio. A blocking `std::process::Command` or `std::net::TcpStream`
//! stalls a runtime thread for the whole transport lifetime.
//! **Required**: `tokio::process::Command`, `tokio::net::TcpStream`, `tokio::net::TcpListener`
//!
//! Reading the config file with `std::fs` before any transport starts is fine
//! and is not checked here.

use architectural_enforcement::scan_production_code;

const FORBIDDEN: [&str; 5] = [
    "std::process::Command",
    "std::net::TcpStream",
    "std::net::TcpListener",
    "std::net::UdpSocket",
    "std::thread::spawn",
];

fn is_blocking_io(code: &str) -> bool {
    FORBIDDEN.iter().any(|pattern| code.contains(pattern))
        || (code.contains("use std::process::") && code.contains("Command"))
        || (code.contains("use std::net::") && code.contains("TcpStream"))
}

/// Test that production code does not use blocking process or network I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = scan_production_code(|_, _, code| is_blocking_io(code));

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        for pattern in FORBIDDEN {
            eprintln!("  - {pattern}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::process::Command::spawn(), child.wait().await");
        eprintln!("  - tokio::net::TcpStream::connect().await");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_blocking_io_detection() {
    assert!(is_blocking_io("let child = std::process::Command::new(path).spawn()?;"));
    assert!(is_blocking_io("use std::process::{Command, Stdio};"));
    assert!(is_blocking_io("use std::net::{SocketAddr, TcpStream};"));
    assert!(!is_blocking_io("use std::process::{ExitStatus, Stdio};"));
    assert!(!is_blocking_io("use std::net::SocketAddr;"));
    assert!(!is_blocking_io("use tokio::process::{Child, Command};"));
}
