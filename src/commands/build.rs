//! `lore build`: analyze a codebase and write its knowledge document.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::common::{build_reasoner, install_interrupt_handler, load_config, open_store, SourceSpec};
use crate::cancel::CancelToken;
use crate::config::LoreConfig;
use crate::error::LoreError;
use crate::pipeline::{BuildEvent, KnowledgeBuilder};
use crate::reasoning::Reasoner;
use crate::store::FileStore;

/// Default output file name.
pub const DEFAULT_OUTPUT: &str = "codebase_knowledge.md";

#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub source: SourceSpec,
    pub output: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_bytes: Option<u64>,
    pub max_abstractions: Option<usize>,
}

impl BuildArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut LoreConfig) {
        config.source.include.extend(self.include.iter().cloned());
        config.source.exclude.extend(self.exclude.iter().cloned());
        if let Some(bytes) = self.max_file_bytes {
            config.source.max_file_bytes = bytes;
        }
        if let Some(max) = self.max_abstractions {
            config.build.max_abstractions = max.max(1);
            config.build.min_abstractions = config.build.min_abstractions.min(max.max(1));
        }
    }
}

pub fn execute(args: BuildArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply_to(&mut config);

    let store = open_store(&args.source, &config)?;
    println!(
        "{} Loaded {} files from {}",
        "✓".green().bold(),
        store.list().len(),
        store.location().cyan()
    );

    let reasoner = build_reasoner(&config)?;
    println!("{} Using {}", "─".dimmed(), reasoner.inner().describe());

    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel)?;

    run_build(&reasoner, store.as_ref(), &config, &cancel, &args.output)
}

/// Build and save; nothing is written unless the whole build succeeds.
pub fn run_build<R: Reasoner + ?Sized, S: FileStore + ?Sized>(
    reasoner: &R,
    store: &S,
    config: &LoreConfig,
    cancel: &CancelToken,
    output: &Path,
) -> Result<()> {
    let builder = KnowledgeBuilder::new(reasoner, config.build.clone())
        .with_cancel(cancel.clone())
        .with_observer(print_event);

    let outcome = match builder.build(store) {
        Ok(outcome) => outcome,
        Err(LoreError::Cancelled { stage }) => {
            println!(
                "{} Build cancelled during {stage}; no document was written",
                "!".yellow().bold()
            );
            return Err(LoreError::Cancelled { stage }.into());
        }
        Err(e) => {
            let stage = e
                .stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "build".to_string());
            return Err(anyhow::Error::new(e).context(format!("Build failed during {stage}")));
        }
    };

    for warning in &outcome.warnings {
        println!("{} {warning}", "!".yellow().bold());
    }

    outcome
        .document
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} Wrote {} ({} chapters)",
        "✓".green().bold(),
        output.display().to_string().bold(),
        outcome.document.chapters.len()
    );
    Ok(())
}

fn print_event(event: &BuildEvent) {
    match event {
        BuildEvent::StageStarted(stage) => {
            println!("{} {}", "─".dimmed(), capitalize(&stage.to_string()));
        }
        BuildEvent::ChapterStarted {
            number,
            total,
            name,
        } => {
            println!("  {} [{number}/{total}] {name}", "·".dimmed());
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
