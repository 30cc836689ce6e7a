//! Production Code Enforcement
//!
//! Library and binary sources must not silence dead code warnings and must
//! propagate errors instead of calling `unwrap()`. Everything from the first
//! `#[cfg(test)]` line onwards counts as test code.

use std::fs;
use std::path::{Path, PathBuf};

const CRATES: &[&str] = &["streamscout-core", "streamscout-search", "streamscout-cli"];

/// A forbidden pattern found in production code
#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    context: String,
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".."))
}

fn find_rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            find_rust_files(&path, files);
        } else if path.extension().is_some_and(|extension| extension == "rs") {
            files.push(path);
        }
    }
}

/// Production sources: `src/` of every shipped crate, minus test doubles.
fn production_files() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut files = Vec::new();
    for krate in CRATES {
        find_rust_files(&root.join(krate).join("src"), &mut files);
    }
    files.retain(|path| !path.ends_with("providers/mock.rs"));
    files.sort();
    files
}

fn scan(pattern: impl Fn(&str) -> bool) -> (usize, Vec<Violation>) {
    let files = production_files();
    let mut violations = Vec::new();

    for path in &files {
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }
            if pattern(trimmed) {
                violations.push(Violation {
                    file_path: path.display().to_string(),
                    line_number: index + 1,
                    context: trimmed.to_string(),
                });
            }
        }
    }

    (files.len(), violations)
}

fn report(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  {}:{}: {}", violation.file_path, violation.line_number, violation.context))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_no_dead_code_allowances() {
    let (checked, violations) = scan(|line| line.contains("#[allow(") && line.contains("dead_code"));

    assert!(checked > 0, "no production sources found");
    assert!(
        violations.is_empty(),
        "dead code allowances in production code:\n{}",
        report(&violations)
    );
}

#[test]
fn test_no_unwrap_in_production_code() {
    let (checked, violations) = scan(|line| line.contains(".unwrap()"));

    assert!(checked > 0, "no production sources found");
    assert!(
        violations.is_empty(),
        "unwrap() in production code, propagate the error instead:\n{}",
        report(&violations)
    );
}
