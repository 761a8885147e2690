//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the supervisor crates MUST NOT call sleep
//! methods. Waiting for a transport is done on I/O (connect attempts, child
//! exit, signals) or paced with `tokio::time::interval`.
//! **Exceptions**: Test code

use architectural_enforcement::scan_production_code;

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan_production_code(|lines, idx, code| {
        (code.contains("::sleep(") || code.contains(".sleep("))
            && !is_interval_pattern(lines, idx)
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Test code (#[cfg(test)] modules, #[test] or #[tokio::test] functions)");
        eprintln!("  - Periodic polling using tokio::time::interval()");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for a process (wait on the child instead)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Check if this is tokio::time::interval pattern (acceptable for periodic tasks)
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let start = current_idx.saturating_sub(20);
    let end = std::cmp::min(current_idx + 5, lines.len());

    lines[start..end]
        .iter()
        .any(|line| line.contains("interval.tick()") || line.contains("tokio::time::interval"))
}

#[test]
fn test_sleep_detection() {
    let lines = vec![
        "async fn wait_for_transport(addr: SocketAddr) {",
        "    loop {",
        "        tokio::time::sleep(Duration::from_millis(100)).await;",
        "    }",
        "}",
    ];
    assert!(!is_interval_pattern(&lines, 2));
}

#[test]
fn test_interval_detection() {
    let lines = vec![
        "let mut interval = tokio::time::interval(poll);",
        "loop {",
        "    interval.tick().await;",
        "}",
    ];
    assert!(is_interval_pattern(&lines, 2));
}
