//! Git command runner used to fetch remote repositories.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Run a git command and return the raw Output. Exit status is left to the caller.
pub fn run_git(args: &[&str], cwd: &Path) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("Failed to execute: git {}", args.join(" ")))
}

/// Run a git command, check for success, and return stdout as a trimmed String.
pub fn run_git_checked(args: &[&str], cwd: &Path) -> Result<String> {
    let output = run_git(args, cwd)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let cmd = args.first().unwrap_or(&"");
        bail!("git {cmd} failed: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether any message in the error chain looks like a network hiccup worth
/// retrying.
pub fn is_transient_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| is_transient_message(&cause.to_string()))
}

fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "could not resolve host",
        "connection timed out",
        "connection reset",
        "early eof",
        "the remote end hung up",
        "rpc failed",
        "temporary failure",
        "http 5",
        "error: 5",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}
