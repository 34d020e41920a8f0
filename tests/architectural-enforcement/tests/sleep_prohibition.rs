//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code never blocks a thread to wait. The only timer
//! sleep allowed is the delay between progress requests in the polling loop,
//! where it is raced against the loop's stop signal.

use architectural_enforcement::{find, workspace_sources, Violation};

fn report(kind: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {kind} found in production code!\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n✅ ACCEPTABLE:");
    eprintln!("  - tokio::time::sleep inside tokio::select! in polling.rs");
    eprintln!("  - Test code (#[cfg(test)] modules, test_utils.rs)");

    panic!(
        "\nFound {} {kind} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[test]
fn test_no_thread_sleep_in_production_code() {
    let files = workspace_sources();
    let violations = find(&files, "Blocking sleep", |_, line| {
        line.code.contains("thread::sleep(")
    });
    report("blocking sleep", &violations);
}

#[test]
fn test_timer_sleep_only_in_polling_loop() {
    let files = workspace_sources();
    let violations = find(&files, "Timer sleep outside polling loop", |file, line| {
        (line.code.contains("::sleep(") || line.code.contains(".sleep("))
            && !line.code.contains("thread::sleep(")
            && file.file_name() != "polling.rs"
    });
    report("timer sleep", &violations);
}
