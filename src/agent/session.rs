use tracing::{info_span, warn};
use uuid::Uuid;

use super::{Answer, RetrievalAgent};
use crate::error::Result;
use crate::models::ConversationTurn;
use crate::reasoning::Reasoner;
use crate::store::FileStore;

/// A run of questions against one loaded document and store.
///
/// Only the question and final answer of each investigation are kept as
/// history, and only as many turns as a prompt can replay; fetched file
/// contents stay with the investigation that read them. A failed question
/// leaves the history untouched.
pub struct QaSession<'a, R: Reasoner + ?Sized, S: FileStore + ?Sized> {
    id: Uuid,
    agent: RetrievalAgent<'a, R, S>,
    history: Vec<ConversationTurn>,
    asked: usize,
}

impl<'a, R: Reasoner + ?Sized, S: FileStore + ?Sized> QaSession<'a, R, S> {
    pub fn new(agent: RetrievalAgent<'a, R, S>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent,
            history: Vec::new(),
            asked: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn ask(&mut self, question: &str) -> Result<Answer> {
        self.asked += 1;
        let span = info_span!("session", id = %self.id, question = self.asked);
        let _guard = span.enter();

        match self.agent.investigate(question, &self.history) {
            Ok(answer) => {
                self.history.push(ConversationTurn::user(question));
                self.history.push(ConversationTurn::agent(
                    answer.text.clone(),
                    answer.consulted_files.clone(),
                ));
                // Turns beyond the replay budget can never reach a prompt again
                let keep = self.agent.config().transcript_max_turns;
                let excess = self.history.len().saturating_sub(keep);
                self.history.drain(..excess);
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                Err(e)
            }
        }
    }
}
