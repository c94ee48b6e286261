//! `lore completions`: shell completion scripts.

use anyhow::{anyhow, Result};
use clap::Command;
use clap_complete::{generate, shells};
use std::io::Write;
use std::str::FromStr;

/// Supported shell types for completion generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl FromStr for Shell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "powershell" | "pwsh" => Ok(Shell::PowerShell),
            _ => Err(anyhow!(
                "Unsupported shell: {s}. Supported shells: bash, zsh, fish, powershell"
            )),
        }
    }
}

/// Write the completion script for `shell` to `out`.
pub fn generate_completions<W: Write>(cmd: &mut Command, shell: Shell, out: &mut W) {
    let bin_name = cmd.get_name().to_string();

    match shell {
        Shell::Bash => generate(shells::Bash, cmd, bin_name, out),
        Shell::Zsh => generate(shells::Zsh, cmd, bin_name, out),
        Shell::Fish => generate(shells::Fish, cmd, bin_name, out),
        Shell::PowerShell => generate(shells::PowerShell, cmd, bin_name, out),
    }
}
