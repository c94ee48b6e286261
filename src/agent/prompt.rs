//! Prompt assembly and response interpretation for the retrieval agent.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::document::KnowledgeDocument;
use crate::models::{Chapter, ConversationTurn};

/// Paths listed in the prompt before the listing is cut off.
const MAX_LISTED_FILES: usize = 200;

fn request_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[REQUEST_FILE:\s*([^\]\n]+?)\s*\]").expect("Invalid regex pattern")
    })
}

/// What the reasoning step decided on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    Answer(String),
    /// A path or glob, plus any prose surrounding the marker
    Request { path: String, remainder: String },
}

/// Interpret a response: the first `[REQUEST_FILE: ...]` marker wins.
pub fn parse_reply(response: &str) -> AgentReply {
    match request_pattern().captures(response) {
        Some(caps) => {
            let path = caps[1].trim().trim_matches(['`', '"', '\'']).trim().to_string();
            if path.is_empty() {
                return AgentReply::Answer(response.trim().to_string());
            }
            AgentReply::Request {
                path,
                remainder: strip_requests(response),
            }
        }
        None => AgentReply::Answer(response.trim().to_string()),
    }
}

/// The response with every request marker removed.
pub fn strip_requests(response: &str) -> String {
    request_pattern().replace_all(response, "").trim().to_string()
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

fn relevance(question: &HashSet<String>, doc: &KnowledgeDocument, chapter: &Chapter) -> usize {
    let (name, description) = doc
        .abstraction(chapter.abstraction_index)
        .map(|a| (a.name.as_str(), a.description.as_str()))
        .unwrap_or(("", ""));
    let name_hits = words(name).intersection(question).count();
    let other_hits = words(&format!("{description} {}", chapter.content))
        .intersection(question)
        .count();
    name_hits * 3 + other_hits
}

/// Summary, relationships and the chapters most relevant to `question`,
/// within `max_chars`.
///
/// Chapters are ranked by word overlap with the question (ties by sequence
/// number) and emitted in reading order.
pub fn knowledge_excerpt(doc: &KnowledgeDocument, question: &str, max_chars: usize) -> String {
    let mut out = format!("Project: {}\n\nSummary:\n{}\n", doc.project, doc.summary.trim());

    if !doc.relationships.is_empty() {
        out.push_str("\nRelationships:\n");
        for rel in &doc.relationships {
            let from = doc.abstraction(rel.from).map(|a| a.name.as_str()).unwrap_or("?");
            let to = doc.abstraction(rel.to).map(|a| a.name.as_str()).unwrap_or("?");
            out.push_str(&format!("- {from} -> {to}: {}\n", rel.label));
        }
    }

    out.push_str("\nChapters:\n");
    for chapter in &doc.chapters {
        let files = doc.abstraction_files(chapter.abstraction_index).join(", ");
        out.push_str(&format!("- {} [{files}]\n", doc.chapter_title(chapter)));
    }

    let question_words = words(question);
    let mut ranked: Vec<(usize, &Chapter)> = doc
        .chapters
        .iter()
        .map(|c| (relevance(&question_words, doc, c), c))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.sequence_number.cmp(&b.1.sequence_number)));

    let mut used = out.len();
    let mut chosen: Vec<&Chapter> = Vec::new();
    for (_, chapter) in ranked {
        let cost = chapter.content.len() + 64;
        if used + cost > max_chars {
            continue;
        }
        used += cost;
        chosen.push(chapter);
    }
    chosen.sort_by_key(|c| c.sequence_number);

    for chapter in chosen {
        out.push_str(&format!(
            "\n### {}\n{}\n",
            doc.chapter_title(chapter),
            chapter.content.trim()
        ));
    }
    out
}

/// Inputs for one reasoning call of an investigation.
pub struct TurnPrompt<'a> {
    pub question: &'a str,
    pub knowledge: &'a str,
    pub files: &'a [&'a str],
    pub evidence: &'a str,
    pub transcript: &'a [ConversationTurn],
    pub requests_left: usize,
    /// Set when no further requests will be honoured
    pub final_reason: Option<&'a str>,
}

impl TurnPrompt<'_> {
    pub fn render(&self) -> String {
        let listing: Vec<&str> = self.files.iter().take(MAX_LISTED_FILES).copied().collect();
        let hidden = self.files.len().saturating_sub(MAX_LISTED_FILES);
        let hidden_note = if hidden > 0 {
            format!("\n... and {hidden} more files")
        } else {
            String::new()
        };

        let transcript = if self.transcript.is_empty() {
            "(no earlier conversation)".to_string()
        } else {
            self.transcript
                .iter()
                .map(ConversationTurn::render)
                .collect::<Vec<_>>()
                .join("\n")
        };

        let instructions = match self.final_reason {
            Some(reason) => format!(
                "You cannot request any more files: {reason}.\n\
                 Answer the question now using only the knowledge and evidence above. \
                 Say plainly which parts could not be verified because the investigation was cut short."
            ),
            None => format!(
                "If you need to read a source file to answer accurately, reply with exactly one line:\n\
                 [REQUEST_FILE: path/to/file]\n\
                 A glob pattern such as [REQUEST_FILE: src/*.py] is also accepted. \
                 You may request {} more file(s). Do not request files listed as FileNotFound or already provided.\n\
                 Otherwise, answer the question directly and cite the files you relied on.",
                self.requests_left
            ),
        };

        format!(
            r#"You are an expert on this codebase, answering a developer's question.

## Knowledge document
{knowledge}

## Files in the codebase
{listing}{hidden_note}

## Evidence gathered so far
{evidence}

## Conversation so far
{transcript}

## Question
{question}

## Instructions
{instructions}"#,
            knowledge = self.knowledge.trim(),
            listing = listing.join("\n"),
            evidence = self.evidence,
            question = self.question.trim(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::sample;

    #[test]
    fn test_parse_answer() {
        assert_eq!(
            parse_reply("  The loader reads CSV.\n"),
            AgentReply::Answer("The loader reads CSV.".to_string())
        );
    }

    #[test]
    fn test_parse_request() {
        let reply = parse_reply("Let me look.\n[REQUEST_FILE: `src/main.py`]");
        assert_eq!(
            reply,
            AgentReply::Request {
                path: "src/main.py".to_string(),
                remainder: "Let me look.".to_string()
            }
        );
    }

    #[test]
    fn test_first_request_wins() {
        let reply = parse_reply("[REQUEST_FILE: a.py]\n[REQUEST_FILE: b.py]");
        assert!(matches!(reply, AgentReply::Request { ref path, .. } if path == "a.py"));
    }

    #[test]
    fn test_empty_request_is_an_answer() {
        assert!(matches!(parse_reply("[REQUEST_FILE: ]"), AgentReply::Answer(_)));
    }

    #[test]
    fn test_excerpt_prefers_relevant_chapters() {
        let doc = sample();
        let full = knowledge_excerpt(&doc, "anything", 100_000);
        assert!(full.contains("### Chapter 1: Data Loader"));
        assert!(full.contains("### Chapter 2: Application"));
        assert!(full.contains("- Application -> Data Loader: Uses"));

        // Room for one chapter only: the one matching the question wins
        let base = knowledge_excerpt(&doc, "x", 0).len();
        let tight = knowledge_excerpt(&doc, "How does the application start?", base + 100);
        assert!(tight.contains("### Chapter 2: Application"));
        assert!(!tight.contains("### Chapter 1: Data Loader"));
        assert!(tight.contains("Summary:\nA tiny data pipeline."));
    }

    #[test]
    fn test_final_prompt_forbids_requests() {
        let prompt = TurnPrompt {
            question: "q",
            knowledge: "k",
            files: &["a.py"],
            evidence: "e",
            transcript: &[],
            requests_left: 0,
            final_reason: Some("the request limit was reached"),
        }
        .render();
        assert!(prompt.contains("You cannot request any more files"));
        assert!(!prompt.contains("reply with exactly one line"));
    }
}
