//! Helpers shared by the command implementations: configuration, source
//! selection, reasoning backend and Ctrl-C handling.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::LoreConfig;
use crate::reasoning::{HttpReasoner, RetryingReasoner};
use crate::store::{FileStore, LocalStore, MemoryStore, RemoteStore};

/// Where the source files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Dir(PathBuf),
    Repo(String),
    Example,
}

impl SourceSpec {
    /// Pick the source from mutually exclusive flags, defaulting to the
    /// current directory.
    pub fn from_flags(dir: Option<PathBuf>, repo: Option<String>, example: bool) -> Result<Self> {
        match (dir, repo, example) {
            (Some(dir), None, false) => Ok(SourceSpec::Dir(dir)),
            (None, Some(repo), false) => Ok(SourceSpec::Repo(repo)),
            (None, None, true) => Ok(SourceSpec::Example),
            (None, None, false) => Ok(SourceSpec::Dir(PathBuf::from("."))),
            _ => bail!("Choose only one of --dir, --repo and --example"),
        }
    }
}

/// Load configuration for a command invocation.
pub fn load_config(path: Option<&Path>) -> Result<LoreConfig> {
    LoreConfig::load(path).context("Failed to load configuration")
}

/// Open the file store for `spec` with the configured filters.
pub fn open_store(spec: &SourceSpec, config: &LoreConfig) -> Result<Box<dyn FileStore>> {
    let filter = config.source.filter()?;
    let store: Box<dyn FileStore> = match spec {
        SourceSpec::Dir(dir) => Box::new(
            LocalStore::open(dir, &filter)
                .with_context(|| format!("Failed to read {}", dir.display()))?,
        ),
        SourceSpec::Repo(url) => {
            eprintln!("{} Cloning {url}", "─".dimmed());
            Box::new(
                RemoteStore::clone_repo(
                    url,
                    &filter,
                    config.source.clone_depth,
                    &config.reasoning.retry,
                )
                .with_context(|| format!("Failed to fetch {url}"))?,
            )
        }
        SourceSpec::Example => Box::new(MemoryStore::example()),
    };
    Ok(store)
}

/// The configured HTTP reasoner wrapped in retry with backoff.
pub fn build_reasoner(config: &LoreConfig) -> Result<RetryingReasoner<HttpReasoner>> {
    let http = HttpReasoner::from_config(&config.reasoning)
        .context("Could not set up the language model backend")?;
    Ok(RetryingReasoner::new(http, config.reasoning.retry))
}

/// Install a Ctrl-C handler that cancels `token`. A second Ctrl-C while the
/// token is already cancelled exits immediately.
pub fn install_interrupt_handler(token: &CancelToken) -> Result<()> {
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!(
            "\n{} Interrupted, stopping after the current step (Ctrl-C again to exit)",
            "!".yellow().bold()
        );
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")
}
