//! Source hygiene for the flowsketch crate.
//!
//! Scans `src/` (excluding `_test.rs` siblings) for patterns that either crash
//! or silently drop errors. Budgets only go down. The `.ok()` allowance
//! covers optional env lookups and the lenient string unescape.

use std::fs;
use std::path::{Path, PathBuf};

/// (pattern, budget)
const BUDGETS: &[(&str, usize)] = &[
    (".unwrap()", 0),
    (".expect(", 0),
    ("panic!(", 0),
    ("unreachable!(", 0),
    ("todo!(", 0),
    ("unimplemented!(", 0),
    ("let _ =", 0),
    (".ok()", 3),
    ("#[allow(dead_code)]", 0),
];

fn production_sources(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            production_sources(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs")
            && !path.to_string_lossy().ends_with("_test.rs")
        {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

#[test]
fn pattern_budgets_hold() {
    let mut files = Vec::new();
    production_sources(Path::new("src"), &mut files);
    assert!(!files.is_empty(), "no sources found under src/");

    let mut report = Vec::new();
    for &(pattern, budget) in BUDGETS {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|(path, content)| {
                content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(pattern))
                    .map(move |(n, _)| format!("  {}:{}", path.display(), n + 1))
            })
            .collect();
        if hits.len() > budget {
            report.push(format!("`{pattern}`: {} found, budget {budget}\n{}", hits.len(), hits.join("\n")));
        }
    }
    assert!(report.is_empty(), "hygiene budgets exceeded:\n{}", report.join("\n"));
}
