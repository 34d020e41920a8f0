//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: production code in the analysis crates does no blocking I/O
//! inside async functions and never starts a nested runtime.
//! **Required**: `tokio::fs`, `tokio::io`, and the async `reqwest` client.
//! **Exceptions**: non-async functions (config loading before any request is
//! made), test code.

use architectural_enforcement::{find, workspace_sources, Violation};

fn fail_on(violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ CRITICAL: Blocking calls found in production code!\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n❌ FORBIDDEN:");
    eprintln!("  - reqwest::blocking::*");
    eprintln!("  - block_on(...) (nested runtimes)");
    eprintln!("  - std::fs / std::net / std::io::stdout() inside async fn");
    eprintln!("\n✅ REQUIRED async I/O:");
    eprintln!("  - tokio::fs::read_to_string().await");
    eprintln!("  - tokio::io::stdout().write_all().await");
    eprintln!("  - reqwest::Client (async)");

    panic!(
        "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[test]
fn test_no_blocking_http_client() {
    let files = workspace_sources();
    fail_on(&find(&files, "Blocking HTTP client", |_, line| {
        line.code.contains("reqwest::blocking")
    }));
}

#[test]
fn test_no_nested_runtime() {
    let files = workspace_sources();
    fail_on(&find(&files, "Nested runtime", |_, line| {
        line.code.contains("block_on(") || line.code.contains("Runtime::new(")
    }));
}

#[test]
fn test_no_blocking_io_in_async_functions() {
    let files = workspace_sources();
    fail_on(&find(&files, "Blocking I/O in async fn", |_, line| {
        line.in_async_fn
            && (line.code.contains("std::fs::")
                || line.code.contains("std::net::")
                || line.code.contains("std::io::stdin()")
                || line.code.contains("std::io::stdout()"))
    }));
}

#[test]
fn test_scanner_sees_the_crates() {
    let files = workspace_sources();
    let names: Vec<&str> = files.iter().map(|f| f.file_name()).collect();
    for expected in ["session.rs", "polling.rs", "http.rs", "main.rs", "runner.rs"] {
        assert!(names.contains(&expected), "{expected} was not scanned");
    }
    assert!(!names.contains(&"test_utils.rs"));
}
