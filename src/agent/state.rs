use std::fmt;

use serde::{Deserialize, Serialize};

/// States of one investigation.
///
/// `Thinking` asks the reasoning step for its next move; a file request moves
/// to `RequestingFile` and back, a final answer moves through `Answering` to
/// `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Thinking,
    RequestingFile,
    Answering,
    Done,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Thinking => write!(f, "THINKING"),
            AgentState::RequestingFile => write!(f, "REQUESTING_FILE"),
            AgentState::Answering => write!(f, "ANSWERING"),
            AgentState::Done => write!(f, "DONE"),
        }
    }
}

impl AgentState {
    /// Whether moving from this state to `next` is a legal step.
    ///
    /// Valid transitions:
    /// - `Thinking` -> `RequestingFile` | `Answering`
    /// - `RequestingFile` -> `Thinking`
    /// - `Answering` -> `Done`
    /// - `Done` is terminal
    pub fn can_transition_to(&self, next: &AgentState) -> bool {
        match self {
            AgentState::Thinking => {
                matches!(next, AgentState::RequestingFile | AgentState::Answering)
            }
            AgentState::RequestingFile => matches!(next, AgentState::Thinking),
            AgentState::Answering => matches!(next, AgentState::Done),
            AgentState::Done => false,
        }
    }

    pub fn valid_transitions(&self) -> Vec<AgentState> {
        match self {
            AgentState::Thinking => vec![AgentState::RequestingFile, AgentState::Answering],
            AgentState::RequestingFile => vec![AgentState::Thinking],
            AgentState::Answering => vec![AgentState::Done],
            AgentState::Done => vec![],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done)
    }
}

/// Records the states an investigation passes through and rejects illegal
/// steps.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: AgentState,
    trail: Vec<AgentState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            current: AgentState::Thinking,
            trail: vec![AgentState::Thinking],
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> AgentState {
        self.current
    }

    /// Every state entered so far, starting with `Thinking`.
    pub fn trail(&self) -> &[AgentState] {
        &self.trail
    }

    pub fn advance(&mut self, next: AgentState) -> Result<(), String> {
        if !self.current.can_transition_to(&next) {
            return Err(format!(
                "invalid agent transition: {} -> {next}",
                self.current
            ));
        }
        self.current = next;
        self.trail.push(next);
        Ok(())
    }
}

/// Why an investigation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The reasoning step produced a final answer on its own
    Answered,
    /// A path was requested a second time; answer forced from existing evidence
    DuplicateRequest,
    /// The file-request bound was reached; answer forced from existing evidence
    RoundsExhausted,
}

impl Termination {
    /// Caveat shown with answers from an investigation that was cut short.
    pub fn caveat(&self) -> Option<&'static str> {
        match self {
            Termination::Answered => None,
            Termination::DuplicateRequest => Some(
                "The investigation stopped when a file was requested a second time; \
                 this answer uses only the evidence gathered up to that point.",
            ),
            Termination::RoundsExhausted => Some(
                "The investigation was cut short after reaching the file request limit; \
                 this answer may be incomplete.",
            ),
        }
    }

    pub fn is_partial(&self) -> bool {
        !matches!(self, Termination::Answered)
    }
}
