//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code must not call `std::thread::sleep`. Waiting
//! happens on channels or `tokio::time`, never by parking a runtime thread.

use architectural_enforcement::{scan, PRODUCTION_DIRS};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations = scan(PRODUCTION_DIRS, |code| {
        code.contains("thread::sleep") || code.contains("use std::thread")
    });

    for violation in &violations {
        eprintln!("  {violation}");
    }
    assert!(
        violations.is_empty(),
        "Found {} blocking sleep call(s) in production code",
        violations.len()
    );
}
