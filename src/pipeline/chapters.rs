//! Chapter writing with an explicitly threaded running context.

use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::context::ContextBudget;
use crate::error::{BuildStage, LoreError, Result};
use crate::models::{Abstraction, Chapter, Relationship, SourceFile, TraversalOrder};
use crate::reasoning::Reasoner;
use crate::utils::truncate;

const DIGEST_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq)]
struct WrittenChapter {
    title: String,
    content: String,
}

impl WrittenChapter {
    fn len(&self) -> usize {
        self.title.len() + self.content.len()
    }

    /// First prose line, for chapters that no longer fit in full.
    fn digest(&self) -> String {
        let line = self
            .content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
            .unwrap_or("");
        format!("- {}: {}", self.title, truncate(line, DIGEST_CHARS))
    }
}

/// Chapters written so far, carried from one chapter to the next.
///
/// Values are never mutated in place; [`RunningContext::with_chapter`] returns
/// the extended context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningContext {
    written: Vec<WrittenChapter>,
}

impl RunningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapter(&self, title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut written = self.written.clone();
        written.push(WrittenChapter {
            title: title.into(),
            content: content.into(),
        });
        Self { written }
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Prompt text: the most recent chapters in full, older ones as digests.
    pub fn render(&self, budget: ContextBudget) -> String {
        if self.written.is_empty() {
            return "This is the first chapter.".to_string();
        }
        let start = budget.fit_recent(&self.written, WrittenChapter::len);

        let mut out = String::new();
        if start > 0 {
            out.push_str("Earlier chapters (digest):\n");
            for chapter in &self.written[..start] {
                out.push_str(&chapter.digest());
                out.push('\n');
            }
            out.push('\n');
        }
        for chapter in &self.written[start..] {
            out.push_str(&format!("## {}\n\n{}\n\n", chapter.title, chapter.content.trim()));
        }
        out
    }
}

/// Everything a chapter prompt draws on that does not change between chapters.
#[derive(Debug, Clone, Copy)]
pub struct ChapterInputs<'a> {
    pub project: &'a str,
    pub files: &'a [SourceFile],
    pub abstractions: &'a [Abstraction],
    pub relationships: &'a [Relationship],
    pub order: &'a TraversalOrder,
    pub config: &'a BuildConfig,
}

impl ChapterInputs<'_> {
    fn title(&self, position: usize) -> String {
        let name = self
            .order
            .as_slice()
            .get(position)
            .and_then(|&idx| self.abstractions.get(idx))
            .map(|a| a.name.as_str())
            .unwrap_or("Untitled");
        format!("Chapter {}: {name}", position + 1)
    }

    fn prompt(&self, position: usize, abstraction_index: usize, context: &RunningContext) -> String {
        let abstraction = &self.abstractions[abstraction_index];
        let title = self.title(position);

        let mut structure = String::new();
        for pos in 0..self.order.len() {
            let marker = if pos == position { "  <- this chapter" } else { "" };
            structure.push_str(&format!("{}{marker}\n", self.title(pos)));
        }

        let mut related = String::new();
        for rel in self.relationships {
            let other = if rel.from == abstraction_index {
                Some(("uses", rel.to))
            } else if rel.to == abstraction_index {
                Some(("is used by", rel.from))
            } else {
                None
            };
            if let Some((verb, other)) = other {
                if let Some(other) = self.abstractions.get(other) {
                    related.push_str(&format!("- {verb} {} ({})\n", other.name, rel.label));
                }
            }
        }
        if related.is_empty() {
            related.push_str("- none recorded\n");
        }

        let mut code = String::new();
        let mut used = 0usize;
        for &idx in &abstraction.file_indices {
            let Some(file) = self.files.get(idx) else {
                continue;
            };
            if used + file.size() > self.config.prompt_chars {
                code.push_str(&format!("--- {} (content omitted) ---\n\n", file.path));
                continue;
            }
            used += file.size();
            code.push_str(&format!("--- {} ---\n{}\n\n", file.path, file.content));
        }

        format!(
            r#"Write a very beginner-friendly tutorial chapter (in Markdown format) for the project `{project}` about the concept: "{name}". This is {title}.

Concept details:
- Name: {name}
- Description:
{description}

Complete tutorial structure:
{structure}
Relationships:
{related}
Context from previous chapters:
{previous}
Relevant code snippets:
{code}
Instructions for the chapter:
- Do not repeat the chapter title; it is added for you. Use `####` or smaller headings for sections.
- Begin with the problem this abstraction solves and a concrete use case.
- Break complex ideas into small pieces and explain them one by one.
- Keep code blocks short (under 10 lines) and explain each one right after it.
- Use terminology consistent with the previous chapters and link back to them by name where helpful.
- End with a brief conclusion that leads into the next chapter.

Output only the Markdown content for this chapter."#,
            project = self.project,
            name = abstraction.name,
            description = abstraction.description,
            previous = context.render(self.config.chapter_budget()),
        )
    }
}

/// Whether a heading line is `# <name>` or `# Chapter N: <name>`.
fn is_title_heading(line: &str, name: &str) -> bool {
    if !line.starts_with('#') {
        return false;
    }
    let text = line.trim_matches(|c: char| c == '#' || c.is_whitespace());
    let lower = text.to_lowercase();
    let title = match lower.strip_prefix("chapter") {
        Some(rest) => match rest.trim_start().split_once(':') {
            Some((number, title))
                if !number.is_empty() && number.trim().chars().all(|c| c.is_ascii_digit()) =>
            {
                title.trim()
            }
            _ => lower.as_str(),
        },
        None => lower.as_str(),
    };
    title == name.trim().to_lowercase()
}

/// Drop a leading heading that merely restates the chapter title.
fn strip_title(response: &str, name: &str) -> String {
    let trimmed = response.trim();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    if is_title_heading(first.trim_end(), name) {
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

/// Write the chapter at `position` of the traversal order.
///
/// Stateless: everything it knows about earlier chapters comes from `context`.
pub fn write_chapter<R: Reasoner + ?Sized>(
    reasoner: &R,
    inputs: &ChapterInputs<'_>,
    position: usize,
    context: &RunningContext,
) -> Result<Chapter> {
    let abstraction_index = inputs.order.as_slice()[position];
    let prompt = inputs.prompt(position, abstraction_index, context);
    debug!(chapter = position + 1, prompt_chars = prompt.len(), "writing chapter");

    let response = reasoner
        .complete(&prompt)
        .map_err(|source| LoreError::ReasoningFailed {
            stage: BuildStage::Chapters,
            source,
        })?;

    let name = &inputs.abstractions[abstraction_index].name;
    let mut content = strip_title(&response, name);
    if content.is_empty() {
        warn!(chapter = position + 1, "empty chapter response");
        content = "_No content was generated for this chapter._".to_string();
    }

    Ok(Chapter {
        abstraction_index,
        sequence_number: position + 1,
        content,
    })
}

/// Title used for a chapter in the running context and the document.
pub fn chapter_title(inputs: &ChapterInputs<'_>, position: usize) -> String {
    inputs.title(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ScriptedReasoner;
    use std::collections::BTreeSet;

    #[test]
    fn test_context_keeps_recent_and_digests_old() {
        let context = RunningContext::new()
            .with_chapter("Chapter 1: Loader", "#### Intro\nThe loader reads files.\nMore text.")
            .with_chapter("Chapter 2: Processor", "p".repeat(50))
            .with_chapter("Chapter 3: Charts", "c".repeat(50));
        let rendered = context.render(ContextBudget::new(200, 2));
        assert!(rendered.contains("- Chapter 1: Loader: The loader reads files."));
        assert!(rendered.contains("## Chapter 2: Processor"));
        assert!(rendered.contains("## Chapter 3: Charts"));
        assert!(!rendered.contains("## Chapter 1"));
    }

    #[test]
    fn test_with_chapter_does_not_mutate() {
        let empty = RunningContext::new();
        let one = empty.with_chapter("Chapter 1: A", "a");
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(empty.render(ContextBudget::new(10, 1)), "This is the first chapter.");
    }

    #[test]
    fn test_section_heading_containing_the_name_is_kept() {
        let response = "## What happens at startup\nThe app boots.";
        assert_eq!(strip_title(response, "App"), response);
        assert_eq!(
            strip_title("# Chapter 2: App Settings\nBody", "App"),
            "# Chapter 2: App Settings\nBody"
        );
        assert_eq!(strip_title("# Chapter 2: App\nBody", "App"), "Body");
    }

    #[test]
    fn test_strip_title() {
        assert_eq!(strip_title("# Chapter 1: Loader\n\nBody", "Loader"), "Body");
        assert_eq!(strip_title("## Other\nBody", "Loader"), "## Other\nBody");
        assert_eq!(strip_title("## loader\nBody", "Loader"), "Body");
        assert_eq!(strip_title("# Loader", "Loader"), "");
    }

    #[test]
    fn test_write_chapter_uses_context_and_files() {
        let files = vec![SourceFile::new(0, "loader.py", "def load(): pass")];
        let abstractions = vec![
            Abstraction {
                name: "Loader".to_string(),
                description: "Reads input.".to_string(),
                file_indices: BTreeSet::from([0]),
                entry_point: false,
            },
            Abstraction {
                name: "App".to_string(),
                description: "Runs it.".to_string(),
                file_indices: BTreeSet::from([0]),
                entry_point: true,
            },
        ];
        let relationships = vec![Relationship {
            from: 1,
            to: 0,
            label: "Calls".to_string(),
        }];
        let order = TraversalOrder::new(vec![0, 1]).unwrap();
        let config = BuildConfig::default();
        let inputs = ChapterInputs {
            project: "demo",
            files: &files,
            abstractions: &abstractions,
            relationships: &relationships,
            order: &order,
            config: &config,
        };
        let stub = ScriptedReasoner::from_texts(["The app starts here."]);
        let context = RunningContext::new().with_chapter("Chapter 1: Loader", "Loads things.");

        let chapter = write_chapter(&stub, &inputs, 1, &context).unwrap();
        assert_eq!(chapter.abstraction_index, 1);
        assert_eq!(chapter.sequence_number, 2);
        assert_eq!(chapter.content, "The app starts here.");

        let prompt = &stub.prompts()[0];
        assert!(prompt.contains("Chapter 2: App  <- this chapter"));
        assert!(prompt.contains("- uses Loader (Calls)"));
        assert!(prompt.contains("Loads things."));
        assert!(prompt.contains("def load(): pass"));
    }
}
