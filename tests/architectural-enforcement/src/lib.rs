//! Architectural Enforcement Integration Tests
//!
//! Source-level checks that keep the layering honest:
//! - The core crate never depends on a terminal UI library
//! - Production code never blocks a runtime thread with `std::thread::sleep`
//!
//! This library only holds the helpers the tests in `tests/` share.

use std::fs;
use std::path::{Path, PathBuf};

/// Directories holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "tui/src"];

/// A source line that broke a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the line is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// All `.rs` files under `dir`
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production lines of a source file: comments stripped, and nothing from
/// the first `#[cfg(test)]` onwards
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter_map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            (!code.trim().is_empty()).then_some((idx + 1, code))
        })
        .collect()
}

/// Scan production code under `dirs` for lines matching `is_violation`
pub fn scan(dirs: &[&str], is_violation: impl Fn(&str) -> bool) -> Vec<Violation> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in dirs {
        for path in rust_files(&root.join(dir)) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            for (line, code) in production_lines(&content) {
                if is_violation(code) {
                    violations.push(Violation {
                        path: path.clone(),
                        line,
                        text: code.trim().to_string(),
                    });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let src = "use a;\n// note\nfn f() {} // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(src);
        assert_eq!(lines, vec![(1, "use a;"), (3, "fn f() {} ")]);
    }

    #[test]
    fn test_workspace_root_contains_members() {
        let root = workspace_root();
        assert!(root.join("conductor/core/Cargo.toml").exists());
        assert!(root.join("tui/Cargo.toml").exists());
    }
}
