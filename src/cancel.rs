//! Cooperative cancellation between pipeline stages and agent turns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BuildStage, LoreError, Result};

/// Shared flag checked at stage boundaries.
///
/// Cloning yields a handle to the same flag, so a Ctrl-C handler can hold one
/// clone while the build holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so an interactive session can continue.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Fail with `Cancelled` if cancellation has been requested.
    pub fn check(&self, stage: BuildStage) -> Result<()> {
        if self.is_cancelled() {
            return Err(LoreError::Cancelled { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let handler_side = token.clone();
        assert!(token.check(BuildStage::Extraction).is_ok());

        handler_side.cancel();
        let err = token.check(BuildStage::Chapters).unwrap_err();
        assert!(matches!(
            err,
            LoreError::Cancelled {
                stage: BuildStage::Chapters
            }
        ));

        token.reset();
        assert!(!handler_side.is_cancelled());
    }
}
