//! Error taxonomy for the build and query phases.
//!
//! Only conditions that abort a stage live here. Non-fatal outcomes
//! (dropped relationships, missing files requested by the agent, an exhausted
//! retrieval loop) are reported as values on the stage results instead.

use std::fmt;
use thiserror::Error;

use crate::reasoning::ReasoningError;

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Loading,
    Extraction,
    Relationships,
    Ordering,
    Chapters,
    Writing,
    Query,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Loading => write!(f, "source loading"),
            BuildStage::Extraction => write!(f, "abstraction extraction"),
            BuildStage::Relationships => write!(f, "relationship mapping"),
            BuildStage::Ordering => write!(f, "order planning"),
            BuildStage::Chapters => write!(f, "chapter writing"),
            BuildStage::Writing => write!(f, "document writing"),
            BuildStage::Query => write!(f, "question answering"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoreError {
    /// No files to analyze: empty directory, clone failure, missing git.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The extraction response stayed invalid after the corrective retry.
    #[error("abstraction extraction failed validation after {attempts} attempts: {}", .problems.join("; "))]
    ExtractionValidation { attempts: u32, problems: Vec<String> },

    /// Reasoning call failed for good (retries exhausted or fatal error).
    #[error("{stage} failed: {source}")]
    ReasoningFailed {
        stage: BuildStage,
        #[source]
        source: ReasoningError,
    },

    #[error("cancelled during {stage}")]
    Cancelled { stage: BuildStage },

    #[error("malformed knowledge document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LoreError {
    /// Stage the error belongs to, when it is attributable to one.
    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            LoreError::SourceUnavailable(_) => Some(BuildStage::Loading),
            LoreError::ExtractionValidation { .. } => Some(BuildStage::Extraction),
            LoreError::ReasoningFailed { stage, .. } | LoreError::Cancelled { stage } => {
                Some(*stage)
            }
            LoreError::MalformedDocument(_) | LoreError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoreError>;
