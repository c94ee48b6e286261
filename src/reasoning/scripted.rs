//! Deterministic reasoner that replays canned responses.
//!
//! Records every prompt it receives so callers can check what the reasoning
//! step was shown.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Reasoner, ReasoningError};

type Responder = Box<dyn Fn(&str, usize) -> Result<String, ReasoningError> + Send + Sync>;

pub struct ScriptedReasoner {
    script: Mutex<VecDeque<Result<String, ReasoningError>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    /// Replay `responses` in order; once exhausted every call fails fatally.
    pub fn new(responses: Vec<Result<String, ReasoningError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replay plain text responses.
    pub fn from_texts<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self::new(responses.into_iter().map(|s| Ok(s.into())).collect())
    }

    /// Compute each response from the prompt and the 0-based call number.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, ReasoningError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl std::fmt::Debug for ScriptedReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedReasoner")
            .field("calls", &self.calls())
            .finish()
    }
}

impl Reasoner for ScriptedReasoner {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        let call_number = {
            let mut prompts = self
                .prompts
                .lock()
                .map_err(|_| ReasoningError::Fatal("prompt log poisoned".to_string()))?;
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        if let Some(responder) = &self.responder {
            return responder(prompt, call_number);
        }

        self.script
            .lock()
            .map_err(|_| ReasoningError::Fatal("script poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(ReasoningError::Fatal("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order_and_records_prompts() {
        let stub = ScriptedReasoner::from_texts(["one", "two"]);
        assert_eq!(stub.complete("a").unwrap(), "one");
        assert_eq!(stub.complete("b").unwrap(), "two");
        assert!(stub.complete("c").is_err());
        assert_eq!(stub.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_responder_sees_call_number() {
        let stub = ScriptedReasoner::from_fn(|_, n| Ok(format!("call {n}")));
        assert_eq!(stub.complete("x").unwrap(), "call 0");
        assert_eq!(stub.complete("y").unwrap(), "call 1");
    }
}
