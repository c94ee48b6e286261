use serde::{Deserialize, Serialize};

/// One file admitted by a store, addressed by its stable index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub index: usize,
    /// `/`-separated path relative to the store root
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(index: usize, path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            index,
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}
