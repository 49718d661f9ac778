//! Integration Test: Core Stays Headless
//!
//! **Policy**: `conductor/core` is UI-agnostic. It must not depend on, or
//! mention in code, any terminal UI crate.

use std::fs;

use architectural_enforcement::{scan, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest should be readable");

    for krate in UI_CRATES {
        assert!(
            !manifest
                .lines()
                .any(|line| line.trim_start().starts_with(krate)),
            "conductor/core/Cargo.toml depends on {krate}"
        );
    }
}

#[test]
fn test_core_sources_do_not_use_ui_crates() {
    let violations = scan(&["conductor/core/src"], |code| {
        UI_CRATES
            .iter()
            .any(|krate| code.contains(&format!("{krate}::")))
    });

    for violation in &violations {
        eprintln!("  {violation}");
    }
    assert!(
        violations.is_empty(),
        "Found {} UI crate reference(s) in conductor/core",
        violations.len()
    );
}
