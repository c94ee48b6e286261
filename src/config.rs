//! Layered configuration: built-in defaults, then a TOML file, then
//! environment overrides, then command-line flags (applied by the caller).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::ContextBudget;
use crate::retry::RetryPolicy;
use crate::store::filter::{FileFilter, DEFAULT_MAX_FILE_BYTES};

/// Name of the project-local config file.
pub const CONFIG_FILE_NAME: &str = "lore.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoreConfig {
    pub source: SourceConfig,
    pub build: BuildConfig,
    pub agent: AgentConfig,
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_bytes: u64,
    /// `git clone --depth` for remote repositories
    pub clone_depth: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            clone_depth: 1,
        }
    }
}

impl SourceConfig {
    pub fn filter(&self) -> Result<FileFilter> {
        FileFilter::new(self.include.as_slice(), self.exclude.as_slice(), self.max_file_bytes)
            .context("Invalid include/exclude pattern")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub min_abstractions: usize,
    /// Upper bound on abstractions the extractor accepts
    pub max_abstractions: usize,
    /// Character budget for file contents shown to the extraction and chapter prompts
    pub prompt_chars: usize,
    /// Character budget for prior chapters replayed while writing the next one
    pub chapter_context_chars: usize,
    pub chapter_context_max_chapters: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            min_abstractions: 5,
            max_abstractions: 10,
            prompt_chars: 400_000,
            chapter_context_chars: 24_000,
            chapter_context_max_chapters: 4,
        }
    }
}

impl BuildConfig {
    pub fn chapter_budget(&self) -> ContextBudget {
        ContextBudget::new(self.chapter_context_chars, self.chapter_context_max_chapters)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// File-request round trips allowed per question
    pub max_rounds: usize,
    /// Character budget for the knowledge excerpt in each prompt
    pub knowledge_chars: usize,
    /// Character budget for fetched file contents in each prompt
    pub evidence_chars: usize,
    pub transcript_chars: usize,
    pub transcript_max_turns: usize,
    /// Matches shown for a glob-style request
    pub max_pattern_matches: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            knowledge_chars: 60_000,
            evidence_chars: 120_000,
            transcript_chars: 12_000,
            transcript_max_turns: 12,
            max_pattern_matches: 3,
        }
    }
}

impl AgentConfig {
    pub fn transcript_budget(&self) -> ContextBudget {
        ContextBudget::new(self.transcript_chars, self.transcript_max_turns)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gemini if `GOOGLE_API_KEY` is set, else OpenAI if `OPENAI_API_KEY` is set
    #[default]
    Auto,
    #[serde(alias = "open-ai")]
    OpenAi,
    Gemini,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Provider::Auto),
            "openai" | "open-ai" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => anyhow::bail!("Unknown provider '{other}' (expected auto, openai or gemini)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub provider: Provider,
    /// Model name; provider default when unset
    pub model: Option<String>,
    /// Base URL override (OpenAI-compatible gateways, proxies)
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Auto,
            model: None,
            endpoint: None,
            timeout_secs: 180,
            retry: RetryPolicy::default(),
        }
    }
}

impl LoreConfig {
    /// Load configuration from `explicit`, else `./lore.toml`, else the user
    /// config directory, else defaults. Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        let user = dirs::config_dir()?.join("lore").join("config.toml");
        user.exists().then_some(user)
    }

    /// Apply `LORE_PROVIDER`, `LORE_MODEL` and `LORE_MAX_ROUNDS`.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("LORE_PROVIDER") {
            match provider.parse() {
                Ok(p) => self.reasoning.provider = p,
                Err(e) => tracing::warn!("ignoring LORE_PROVIDER: {e}"),
            }
        }
        if let Ok(model) = std::env::var("LORE_MODEL") {
            if !model.trim().is_empty() {
                self.reasoning.model = Some(model.trim().to_string());
            }
        }
        if let Ok(rounds) = std::env::var("LORE_MAX_ROUNDS") {
            match rounds.trim().parse() {
                Ok(n) => self.agent.max_rounds = n,
                Err(_) => tracing::warn!("ignoring LORE_MAX_ROUNDS: '{rounds}' is not a number"),
            }
        }
    }
}
