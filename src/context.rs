//! Context budgeting for text replayed into prompts.
//!
//! Both the running chapter context and the agent transcript grow with every
//! step. They are cut back to the most recent items that fit a character and
//! item budget; older items are dropped or digested by the caller.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_chars: usize,
    pub max_items: usize,
}

impl ContextBudget {
    pub fn new(max_chars: usize, max_items: usize) -> Self {
        Self {
            max_chars,
            max_items,
        }
    }

    /// Start index of the longest suffix of `items` that fits the budget.
    ///
    /// Returns `items.len()` when not even the last item fits.
    pub fn fit_recent<T>(&self, items: &[T], len: impl Fn(&T) -> usize) -> usize {
        let mut used = 0usize;
        let mut start = items.len();

        for (idx, item) in items.iter().enumerate().rev() {
            if items.len() - idx > self.max_items {
                break;
            }
            let item_len = len(item);
            if used.saturating_add(item_len) > self.max_chars {
                break;
            }
            used += item_len;
            start = idx;
        }

        if start > 0 {
            debug!(
                kept = items.len() - start,
                dropped = start,
                max_chars = self.max_chars,
                "context budget exceeded, keeping most recent items"
            );
        }
        start
    }
}
