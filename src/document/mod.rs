//! The knowledge document: the only artifact crossing the build/query boundary.
//!
//! Persisted as markdown for people plus a trailing YAML metadata block for
//! the query phase. Section bodies are bracketed by HTML comment markers so
//! chapter text may contain any headings of its own.

mod parse;
mod render;

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{LoreError, Result};
use crate::models::{Abstraction, Chapter, Relationship, TraversalOrder};

pub use render::slugify;

/// Metadata format version written by this build.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeDocument {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    /// Fingerprint of the file snapshot the document was built from
    pub fingerprint: String,
    /// Store paths at build time; `Abstraction::file_indices` index into this
    pub files: Vec<String>,
    pub summary: String,
    pub abstractions: Vec<Abstraction>,
    pub relationships: Vec<Relationship>,
    pub order: TraversalOrder,
    /// In traversal order
    pub chapters: Vec<Chapter>,
}

impl KnowledgeDocument {
    /// Check the cross-references between abstractions, relationships,
    /// traversal order and chapters.
    pub fn validate(&self) -> Result<()> {
        let n = self.abstractions.len();
        let malformed = |msg: String| Err(LoreError::MalformedDocument(msg));

        if self.order.len() != n {
            return malformed(format!(
                "traversal order covers {} abstractions, expected {n}",
                self.order.len()
            ));
        }
        if self.chapters.len() != n {
            return malformed(format!("{} chapters for {n} abstractions", self.chapters.len()));
        }
        for (position, (chapter, expected)) in
            self.chapters.iter().zip(self.order.iter()).enumerate()
        {
            if chapter.abstraction_index != expected || chapter.sequence_number != position + 1 {
                return malformed(format!(
                    "chapter {} does not follow the traversal order",
                    position + 1
                ));
            }
        }
        for rel in &self.relationships {
            if rel.from >= n || rel.to >= n {
                return malformed(format!(
                    "relationship {} -> {} out of range",
                    rel.from, rel.to
                ));
            }
            if rel.from == rel.to {
                return malformed(format!("self-loop relationship on {}", rel.from));
            }
        }
        for abstraction in &self.abstractions {
            if let Some(bad) = abstraction
                .file_indices
                .iter()
                .find(|&&idx| idx >= self.files.len())
            {
                return malformed(format!(
                    "abstraction '{}' references file index {bad} of {}",
                    abstraction.name,
                    self.files.len()
                ));
            }
        }
        Ok(())
    }

    pub fn abstraction(&self, index: usize) -> Option<&Abstraction> {
        self.abstractions.get(index)
    }

    /// Heading text for a chapter, e.g. `Chapter 2: Data Loader`.
    pub fn chapter_title(&self, chapter: &Chapter) -> String {
        let name = self
            .abstraction(chapter.abstraction_index)
            .map(|a| a.name.as_str())
            .unwrap_or("Untitled");
        format!("Chapter {}: {name}", chapter.sequence_number)
    }

    /// Build-time paths of the files an abstraction touches.
    pub fn abstraction_files(&self, index: usize) -> Vec<&str> {
        self.abstraction(index)
            .map(|a| {
                a.file_indices
                    .iter()
                    .filter_map(|&i| self.files.get(i).map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write the document atomically; nothing appears at `path` unless the
    /// whole document was written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| LoreError::Io(e.error))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
