//! Development automation tasks for the CareBridge workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::Context;

mod features;

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("deny") => run_external_tool("deny", &["check"]),
        Some("audit") => run_external_tool("audit", &[]),
        Some("test-features") => features::test_feature_matrix(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("CareBridge Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci             Run all CI checks");
    println!("                   (fmt, clippy, test-features, test, deny, audit)");
    println!("    fmt            Check Rust code formatting");
    println!("    clippy         Run Clippy lints");
    println!("    test           Run all tests");
    println!("    test-features  Verify the common/core feature matrix compiles");
    println!("    deny           Check dependencies with cargo-deny");
    println!("    audit          Audit dependencies for security vulnerabilities");
    println!("    help           Show this help message");
}

/// Run all CI checks in sequence
fn run_ci() -> anyhow::Result<()> {
    let steps: [(&str, fn() -> anyhow::Result<()>); 6] = [
        ("Checking Rust format", run_fmt),
        ("Running Clippy", run_clippy),
        ("Checking feature combinations", features::test_feature_matrix),
        ("Running tests", run_test),
        ("Checking dependencies", || run_external_tool("deny", &["check"])),
        ("Auditing dependencies", || run_external_tool("audit", &[])),
    ];

    println!("==> Running CI checks...");
    for (index, (label, step)) in steps.iter().enumerate() {
        println!("\n==> Step {}/{}: {label}...", index + 1, steps.len());
        step()?;
    }

    println!("\n✓ All CI checks passed!");
    Ok(())
}

/// Run `cargo <args>` and fail with `message` on a non-zero exit
pub(crate) fn cargo(args: &[&str], message: &str) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("{message}");
    }
    Ok(())
}

fn run_fmt() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "Format check failed. Run 'cargo fmt --all' to fix.")
}

fn run_clippy() -> anyhow::Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"],
        "Clippy run failed. See output above.",
    )
}

fn run_test() -> anyhow::Result<()> {
    cargo(&["test", "--workspace", "--all-features"], "Tests failed")
}

/// Run an optional cargo subcommand such as `cargo deny`
fn run_external_tool(tool: &str, args: &[&str]) -> anyhow::Result<()> {
    let installed = Command::new("cargo")
        .args([tool, "--version"])
        .output()
        .is_ok_and(|output| output.status.success());

    if !installed {
        eprintln!("cargo-{tool} is not installed.");
        eprintln!("Install it with: cargo install cargo-{tool}");
        anyhow::bail!("cargo-{tool} not found");
    }

    let mut full = vec![tool];
    full.extend_from_slice(args);
    cargo(&full, &format!("cargo-{tool} found issues"))
}
