//! Query phase: answer questions from the knowledge document, reading source
//! files on demand.
//!
//! Each question is one investigation, a bounded state machine over
//! [`AgentState`]. At most `max_rounds` file requests are honoured; after that,
//! or when a path is requested a second time, one final call is made that must
//! answer from the evidence at hand. An investigation therefore never makes
//! more than `max_rounds + 1` reasoning calls.

pub mod evidence;
pub mod prompt;
pub mod session;
pub mod state;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::AgentConfig;
use crate::document::KnowledgeDocument;
use crate::error::{BuildStage, LoreError, Result};
use crate::models::ConversationTurn;
use crate::reasoning::{Reasoner, ReasoningError};
use crate::store::FileStore;

pub use evidence::{Evidence, EvidenceSet};
pub use prompt::{knowledge_excerpt, parse_reply, AgentReply};
pub use session::QaSession;
pub use state::{AgentState, StateMachine, Termination};

/// Final result of one investigation.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Files whose content was read, in request order
    pub consulted_files: Vec<String>,
    pub termination: Termination,
    /// Reasoning calls made
    pub calls: usize,
    /// The investigation's own turns, in order
    pub transcript: Vec<ConversationTurn>,
    pub evidence: Vec<Evidence>,
}

impl Answer {
    pub fn caveat(&self) -> Option<&'static str> {
        self.termination.caveat()
    }

    pub fn is_partial(&self) -> bool {
        self.termination.is_partial()
    }
}

const FALLBACK_ANSWER: &str =
    "I could not reach a conclusive answer with the files gathered so far.";

pub struct RetrievalAgent<'a, R: Reasoner + ?Sized, S: FileStore + ?Sized> {
    reasoner: &'a R,
    store: &'a S,
    document: &'a KnowledgeDocument,
    config: AgentConfig,
    cancel: CancelToken,
}

impl<'a, R: Reasoner + ?Sized, S: FileStore + ?Sized> RetrievalAgent<'a, R, S> {
    pub fn new(
        reasoner: &'a R,
        store: &'a S,
        document: &'a KnowledgeDocument,
        config: AgentConfig,
    ) -> Self {
        Self {
            reasoner,
            store,
            document,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn document(&self) -> &KnowledgeDocument {
        self.document
    }

    /// Answer one question. `history` holds earlier turns of the session and
    /// is replayed within the transcript budget.
    pub fn investigate(&self, question: &str, history: &[ConversationTurn]) -> Result<Answer> {
        let max_rounds = self.config.max_rounds;
        let knowledge = knowledge_excerpt(self.document, question, self.config.knowledge_chars);
        let files: Vec<&str> = self.store.list().iter().map(|f| f.path.as_str()).collect();

        let mut machine = StateMachine::new();
        let mut evidence = EvidenceSet::new();
        let mut transcript = vec![ConversationTurn::user(question)];
        let mut rounds = 0usize;
        let mut calls = 0usize;
        let mut forced: Option<Termination> = None;

        loop {
            self.cancel.check(BuildStage::Query)?;

            let requests_left = max_rounds.saturating_sub(rounds);
            let final_reason = match forced {
                Some(Termination::DuplicateRequest) => {
                    Some("a file was requested that was already requested")
                }
                Some(_) => Some("the file request limit was reached"),
                None if requests_left == 0 => Some("file requests are disabled"),
                None => None,
            };

            // The current question is shown separately
            let replay: Vec<&ConversationTurn> =
                history.iter().chain(transcript.iter().skip(1)).collect();
            let start = self
                .config
                .transcript_budget()
                .fit_recent(&replay, |turn| turn.content.len());
            let recent: Vec<ConversationTurn> =
                replay[start..].iter().map(|turn| (*turn).clone()).collect();

            let prompt = prompt::TurnPrompt {
                question,
                knowledge: &knowledge,
                files: &files,
                evidence: &evidence.render(self.config.evidence_chars),
                transcript: &recent,
                requests_left,
                final_reason,
            }
            .render();

            debug!(call = calls + 1, state = %machine.current(), prompt_chars = prompt.len(), "reasoning");
            let response = self
                .reasoner
                .complete(&prompt)
                .map_err(|source| LoreError::ReasoningFailed {
                    stage: BuildStage::Query,
                    source,
                })?;
            calls += 1;

            let (text, termination) = match parse_reply(&response) {
                AgentReply::Request { path, .. } if final_reason.is_none() => {
                    transition(&mut machine, AgentState::RequestingFile)?;
                    transcript.push(ConversationTurn::agent(response.trim(), vec![path.clone()]));

                    if evidence.was_requested(&path) {
                        warn!(%path, "file requested twice, forcing an answer");
                        forced = Some(Termination::DuplicateRequest);
                    } else {
                        let added = evidence.resolve(&path, self.store, self.config.max_pattern_matches);
                        rounds += 1;
                        info!(%path, added, round = rounds, max_rounds, "file request resolved");
                        if rounds >= max_rounds {
                            forced = Some(Termination::RoundsExhausted);
                        }
                    }
                    transition(&mut machine, AgentState::Thinking)?;
                    continue;
                }
                AgentReply::Request { path, remainder } => {
                    debug!(%path, "request ignored on final call");
                    let text = if remainder.is_empty() {
                        FALLBACK_ANSWER.to_string()
                    } else {
                        remainder
                    };
                    (text, forced.unwrap_or(Termination::RoundsExhausted))
                }
                AgentReply::Answer(text) if text.is_empty() => {
                    (FALLBACK_ANSWER.to_string(), forced.unwrap_or(Termination::Answered))
                }
                AgentReply::Answer(text) => (text, forced.unwrap_or(Termination::Answered)),
            };

            transition(&mut machine, AgentState::Answering)?;
            transcript.push(ConversationTurn::agent(text.clone(), Vec::new()));
            transition(&mut machine, AgentState::Done)?;
            info!(calls, rounds, ?termination, "question answered");

            return Ok(Answer {
                text,
                consulted_files: evidence.consulted().to_vec(),
                termination,
                calls,
                transcript,
                evidence: evidence.items().to_vec(),
            });
        }
    }
}

fn transition(machine: &mut StateMachine, next: AgentState) -> Result<()> {
    machine.advance(next).map_err(|msg| LoreError::ReasoningFailed {
        stage: BuildStage::Query,
        source: ReasoningError::Fatal(msg),
    })
}
