//! Layering rules for the deck workspace
//!
//! Each test walks a slice of the source tree and fails with the offending
//! lines listed.

use std::path::PathBuf;

use architectural_enforcement::{report, rust_sources, SourceFile};

fn violations(files: &[SourceFile], needles: &[&str]) -> Vec<(PathBuf, usize, String)> {
    files
        .iter()
        .flat_map(|file| {
            needles.iter().flat_map(move |needle| {
                file.production_matches(needle)
                    .into_iter()
                    .map(move |(line, text)| (file.path.clone(), line, text))
            })
        })
        .collect()
}

/// Folding, metrics, visibility, view and turn derivation run synchronously
/// on every snapshot; none of them may touch the async runtime.
#[test]
fn test_derivation_modules_are_synchronous() {
    let files: Vec<SourceFile> = rust_sources("deck/core/src")
        .into_iter()
        .filter(|file| {
            let path = file.path.to_string_lossy();
            path.contains("/fold/")
                || ["metrics.rs", "visibility.rs", "view.rs", "turn.rs", "composer.rs"]
                    .iter()
                    .any(|name| path.ends_with(name))
        })
        .collect();
    assert!(files.len() >= 8, "expected to find the derivation modules");

    let found = violations(&files, &["tokio", "async fn", ".await"]);
    assert!(
        found.is_empty(),
        "derivation modules must stay synchronous:\n{}",
        report(&found)
    );
}

/// The core is renderer-agnostic.
#[test]
fn test_core_has_no_terminal_dependencies() {
    let files = rust_sources("deck/core/src");
    assert!(!files.is_empty());
    let found = violations(&files, &["ratatui", "crossterm", "textwrap", "deck_replay"]);
    assert!(
        found.is_empty(),
        "core must not depend on rendering crates:\n{}",
        report(&found)
    );
}

/// Library and binary code propagate errors instead of panicking.
#[test]
fn test_no_unwrap_outside_tests() {
    let mut files = rust_sources("deck/core/src");
    files.extend(rust_sources("deck/replay/src"));
    let found = violations(&files, &[".unwrap()", ".expect(", "panic!("]);
    assert!(
        found.is_empty(),
        "use ? or a fallback instead:\n{}",
        report(&found)
    );
}

/// Nothing waits on a timer; every step reacts to input.
#[test]
fn test_no_sleep_in_production_code() {
    let mut files = rust_sources("deck/core/src");
    files.extend(rust_sources("deck/replay/src"));
    let found = violations(&files, &["thread::sleep", "time::sleep"]);
    assert!(found.is_empty(), "found sleep calls:\n{}", report(&found));
}
