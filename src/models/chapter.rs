use serde::{Deserialize, Serialize};

/// Explanatory text for one abstraction, numbered in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub abstraction_index: usize,
    /// 1-based position in the traversal order
    pub sequence_number: usize,
    pub content: String,
}
