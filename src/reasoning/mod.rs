//! The opaque reasoning dependency: `complete(prompt) -> text`.
//!
//! Everything downstream treats the returned text as untrusted and validates
//! its structure before use.

pub mod http;
pub mod response;
pub mod retrying;
pub mod scripted;

use thiserror::Error;

pub use http::HttpReasoner;
pub use retrying::RetryingReasoner;
pub use scripted::ScriptedReasoner;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReasoningError {
    /// Timeout, rate limit, server error, dropped connection
    #[error("transient reasoning failure: {0}")]
    Transient(String),
    /// Bad credentials, rejected request, unusable configuration
    #[error("reasoning call rejected: {0}")]
    Fatal(String),
}

impl ReasoningError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ReasoningError::Transient(_))
    }
}

pub trait Reasoner {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;
}

impl<R: Reasoner + ?Sized> Reasoner for &R {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        (**self).complete(prompt)
    }
}

impl<R: Reasoner + ?Sized> Reasoner for Box<R> {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        (**self).complete(prompt)
    }
}
