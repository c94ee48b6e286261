//! What an investigation has learned from the file store so far.

use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::context::ContextBudget;
use crate::store::filter::{is_glob, match_paths};
use crate::store::FileStore;
use crate::utils::{normalize_path, truncate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    File { path: String, content: String },
    /// Negative information: the path does not exist in the store
    NotFound { path: String },
    /// A glob request and the paths it resolved to
    Pattern {
        pattern: String,
        matched: Vec<String>,
        more: usize,
    },
}

impl Evidence {
    fn render(&self, max_content_chars: usize) -> String {
        match self {
            Evidence::File { path, content } => {
                let budget = max_content_chars.saturating_sub(path.len() + 64);
                format!("--- File: {path} ---\n{}\n--- End of {path} ---", truncate(content, budget))
            }
            Evidence::NotFound { .. } | Evidence::Pattern { .. } => self.to_string(),
        }
    }

    /// Stand-in for file contents that no longer fit the prompt.
    fn brief(&self) -> String {
        match self {
            Evidence::File { path, .. } => {
                format!("--- File: {path} (already read; content omitted for space) ---")
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::File { path, content } => {
                write!(f, "File {path} ({} bytes)", content.len())
            }
            Evidence::NotFound { path } => write!(
                f,
                "FileNotFound: {path} (no such file in this codebase; do not request it again)"
            ),
            Evidence::Pattern {
                pattern,
                matched,
                more,
            } => {
                write!(f, "Pattern {pattern} matched: {}", matched.join(", "))?;
                if *more > 0 {
                    write!(f, " ({more} more files matched but were not included)")?;
                }
                Ok(())
            }
        }
    }
}

/// Evidence gathered by one investigation, in the order it arrived.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    items: Vec<Evidence>,
    requested: HashSet<String>,
    consulted: Vec<String>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Evidence] {
        &self.items
    }

    /// Paths whose content was actually read, in order.
    pub fn consulted(&self) -> &[String] {
        &self.consulted
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether this request (after path normalization) was made before, or
    /// names a file already read through an earlier pattern.
    pub fn was_requested(&self, request: &str) -> bool {
        let normalized = normalize_path(request);
        self.requested.contains(&normalized) || self.consulted.contains(&normalized)
    }

    /// Resolve a request against the store and record the result.
    ///
    /// Returns the number of files whose content was added; zero means the
    /// request produced only a `NotFound` notice.
    pub fn resolve<S: FileStore + ?Sized>(
        &mut self,
        request: &str,
        store: &S,
        max_pattern_matches: usize,
    ) -> usize {
        let normalized = normalize_path(request);
        self.requested.insert(normalized.clone());

        if is_glob(&normalized) {
            let paths = store.list().iter().map(|f| f.path.as_str());
            let matched = match match_paths(&normalized, paths) {
                Ok(matched) => matched,
                Err(e) => {
                    debug!(pattern = %normalized, error = %e, "invalid request pattern");
                    Vec::new()
                }
            };
            if matched.is_empty() {
                self.items.push(Evidence::NotFound { path: normalized });
                return 0;
            }

            let keep = max_pattern_matches.max(1).min(matched.len());
            let shown: Vec<String> = matched[..keep].iter().map(|p| p.to_string()).collect();
            self.items.push(Evidence::Pattern {
                pattern: normalized,
                matched: shown.clone(),
                more: matched.len() - keep,
            });
            let mut added = 0;
            for path in shown {
                if self.consulted.contains(&path) {
                    continue;
                }
                if let Ok(content) = store.read(&path) {
                    self.items.push(Evidence::File {
                        path: path.clone(),
                        content: content.to_string(),
                    });
                    self.consulted.push(path);
                    added += 1;
                }
            }
            return added;
        }

        if self.consulted.contains(&normalized) {
            return 0;
        }
        match store.read(&normalized) {
            Ok(content) => {
                self.items.push(Evidence::File {
                    path: normalized.clone(),
                    content: content.to_string(),
                });
                self.consulted.push(normalized);
                1
            }
            Err(_) => {
                self.items.push(Evidence::NotFound { path: normalized });
                0
            }
        }
    }

    /// Prompt text for the evidence, newest items in full within `max_chars`.
    pub fn render(&self, max_chars: usize) -> String {
        if self.items.is_empty() {
            return "(no files fetched yet)".to_string();
        }
        let rendered: Vec<String> = self.items.iter().map(|e| e.render(max_chars)).collect();
        let start = ContextBudget::new(max_chars, usize::MAX).fit_recent(&rendered, String::len);

        let mut parts: Vec<String> = self.items[..start].iter().map(Evidence::brief).collect();
        parts.extend(rendered.into_iter().skip(start));
        parts.join("\n\n")
    }
}
