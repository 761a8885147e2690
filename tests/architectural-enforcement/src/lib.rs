//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the supervisor crates:
//! - No sleep() calls in production code (wait on I/O or use an interval)
//! - Process and network I/O goes through tokio, never the blocking std types
//!
//! The helpers here find production source files and skip test code, so each
//! test under `tests/` only has to say what a violation looks like.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["supervisor/core/src", "supervisor/daemon/src"];

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// The trimmed source line
    pub line: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line_number, self.line)
    }
}

/// Workspace root, found from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// All `.rs` files under the production directories
///
/// Panics if a production directory is missing, so a moved crate cannot
/// silently turn these checks into no-ops.
#[must_use]
pub fn production_sources() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        assert!(path.is_dir(), "production directory missing: {}", path.display());

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(entry.into_path());
            }
        }
    }

    files
}

/// Strip a trailing `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether the line at `current_idx` sits inside test code
///
/// Everything after a `#[cfg(test)]`-style module attribute counts as test
/// code, as does the body of a `#[test]` or `#[tokio::test]` function.
#[must_use]
pub fn is_in_test_code(lines: &[&str], current_idx: usize) -> bool {
    if lines[..current_idx].iter().any(|line| {
        let line = line.trim();
        line.starts_with("#[cfg(") && line.contains("test")
    }) {
        return true;
    }

    // Scan backwards for #[test] or #[tokio::test]
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }

        let is_fn = line.starts_with("fn ")
            || line.starts_with("pub fn ")
            || line.starts_with("async fn ")
            || line.starts_with("pub async fn ");
        if is_fn && !line.contains("test") {
            return false; // Found a non-test function first
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || line.starts_with("impl ") {
            return false;
        }
    }
    false
}

/// Scan one file's contents, reporting production lines matching `is_violation`
pub fn scan_source<F>(path: &Path, content: &str, is_violation: F) -> Vec<Violation>
where
    F: Fn(&[&str], usize, &str) -> bool,
{
    let lines: Vec<&str> = content.lines().collect();
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        if code.trim().is_empty() || is_in_test_code(&lines, idx) {
            continue;
        }
        if is_violation(&lines, idx, code) {
            violations.push(Violation {
                path: path.to_path_buf(),
                line_number: idx + 1,
                line: line.trim().to_string(),
            });
        }
    }

    violations
}

/// Scan every production source file
pub fn scan_production_code<F>(is_violation: F) -> Vec<Violation>
where
    F: Fn(&[&str], usize, &str) -> bool,
{
    production_sources()
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok().map(|c| (path, c)))
        .flat_map(|(path, content)| scan_source(path, &content, &is_violation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_sources_found() {
        let sources = production_sources();
        assert!(sources.iter().any(|p| p.ends_with("supervisor.rs")));
        assert!(sources.iter().any(|p| p.ends_with("main.rs")));
    }

    #[test]
    fn test_cfg_test_module_is_test_code() {
        let lines = vec![
            "fn production() {}",
            "#[cfg(all(test, unix))]",
            "mod tests {",
            "    fn helper() { thing(); }",
            "}",
        ];
        assert!(!is_in_test_code(&lines, 0));
        assert!(is_in_test_code(&lines, 3));
    }

    #[test]
    fn test_test_function_is_test_code() {
        let lines = vec!["#[tokio::test]", "async fn test_it() {", "    thing();", "}"];
        assert!(is_in_test_code(&lines, 2));
    }

    #[test]
    fn test_comments_are_ignored() {
        let content = "fn f() {\n    // std::thread::sleep(d);\n}\n";
        let found = scan_source(Path::new("f.rs"), content, |_, _, code| {
            code.contains("sleep(")
        });
        assert!(found.is_empty());
    }
}
