//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - Folding, metrics, visibility and turn derivation stay pure (no async runtime)
//! - The core carries no rendering or terminal dependencies
//! - Library code propagates errors instead of panicking
//!
//! These tests are designed to catch violations early in the development cycle.
//! The helpers below walk the workspace sources; the rules live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A Rust source file and its contents
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Full contents
    pub contents: String,
}

impl SourceFile {
    /// Lines before the first `#[cfg(test)]`, paired with 1-based line numbers
    pub fn production_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.contents
            .lines()
            .enumerate()
            .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
            .map(|(index, line)| (index + 1, line))
    }

    /// Whether a production line (ignoring comments) contains `needle`
    pub fn production_matches(&self, needle: &str) -> Vec<(usize, String)> {
        self.production_lines()
            .filter(|(_, line)| {
                let code = line.trim_start();
                !code.starts_with("//") && code.contains(needle)
            })
            .map(|(n, line)| (n, line.trim().to_string()))
            .collect()
    }
}

/// Root of the workspace this crate lives in
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Every `.rs` file under `relative` (from the workspace root)
pub fn rust_sources(relative: &str) -> Vec<SourceFile> {
    WalkDir::new(workspace_root().join(relative))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rs"))
        .filter_map(|entry| {
            let contents = fs::read_to_string(entry.path()).ok()?;
            Some(SourceFile {
                path: entry.path().to_path_buf(),
                contents,
            })
        })
        .collect()
}

/// Format violations for an assertion message
pub fn report(violations: &[(PathBuf, usize, String)]) -> String {
    violations
        .iter()
        .map(|(path, line, text)| format!("  {}:{line}: {text}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            contents: "fn a() {}\n// x.unwrap()\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n"
                .to_string(),
        };
        assert_eq!(file.production_lines().count(), 2);
        assert!(file.production_matches(".unwrap()").is_empty());
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
