use serde::{Deserialize, Serialize};

use super::{KnowledgeDocument, DOCUMENT_VERSION};
use crate::models::{Abstraction, Relationship, TraversalOrder};

pub(super) const METADATA_START: &str = "<!-- lore METADATA - Do not edit manually -->";
pub(super) const METADATA_END: &str = "<!-- END lore METADATA -->";

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct DocumentMetadata {
    pub lore: MetadataBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MetadataBody {
    pub version: u32,
    pub project: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub fingerprint: String,
    pub files: Vec<String>,
    pub abstractions: Vec<Abstraction>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    pub order: TraversalOrder,
}

pub(super) fn begin_marker(section: &str) -> String {
    format!("<!-- lore:begin {section} -->")
}

pub(super) fn end_marker(section: &str) -> String {
    format!("<!-- lore:end {section} -->")
}

pub(super) fn chapter_section(sequence_number: usize) -> String {
    format!("chapter-{sequence_number}")
}

/// GitHub-style heading anchor.
pub fn slugify(heading: &str) -> String {
    heading
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

fn push_section(out: &mut String, section: &str, body: &str) {
    out.push_str(&begin_marker(section));
    out.push('\n');
    out.push_str(body.trim());
    out.push('\n');
    out.push_str(&end_marker(section));
    out.push_str("\n\n");
}

/// Mermaid labels are double-quoted.
fn mermaid_label(text: &str) -> String {
    text.replace('"', "'")
}

impl KnowledgeDocument {
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("# Codebase Knowledge: {}\n\n", self.project));
        out.push_str(&format!(
            "> Generated by lore on {} from {} source files. Chapters follow a learning order: each one builds on those before it.\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.files.len()
        ));

        out.push_str("## Summary\n\n");
        push_section(&mut out, "summary", &self.summary);

        out.push_str("## Relationships\n\n");
        if self.relationships.is_empty() {
            out.push_str("_No relationships recorded._\n\n");
        } else {
            out.push_str("```mermaid\nflowchart TD\n");
            for (idx, abstraction) in self.abstractions.iter().enumerate() {
                out.push_str(&format!(
                    "    A{idx}[\"{}\"]\n",
                    mermaid_label(&abstraction.name)
                ));
            }
            for rel in &self.relationships {
                out.push_str(&format!(
                    "    A{} -- \"{}\" --> A{}\n",
                    rel.from,
                    mermaid_label(&rel.label),
                    rel.to
                ));
            }
            out.push_str("```\n\n");
            for rel in &self.relationships {
                let from = self.abstraction(rel.from).map(|a| a.name.as_str()).unwrap_or("?");
                let to = self.abstraction(rel.to).map(|a| a.name.as_str()).unwrap_or("?");
                out.push_str(&format!("- **{from}** → **{to}**: {}\n", rel.label));
            }
            out.push('\n');
        }

        out.push_str("## Chapters\n\n");
        for chapter in &self.chapters {
            let title = self.chapter_title(chapter);
            out.push_str(&format!(
                "{}. [{}](#{})\n",
                chapter.sequence_number,
                title.split_once(": ").map(|(_, n)| n).unwrap_or(&title),
                slugify(&title)
            ));
        }
        out.push('\n');

        for chapter in &self.chapters {
            out.push_str(&format!("### {}\n\n", self.chapter_title(chapter)));
            let files = self.abstraction_files(chapter.abstraction_index);
            if !files.is_empty() {
                let listed: Vec<String> = files.iter().map(|f| format!("`{f}`")).collect();
                out.push_str(&format!("_Files: {}_\n\n", listed.join(", ")));
            }
            push_section(
                &mut out,
                &chapter_section(chapter.sequence_number),
                &chapter.content,
            );
        }

        out.push_str("---\n\n## Using This Document\n\n");
        out.push_str("* Read the chapters in order; later chapters assume the earlier ones.\n");
        out.push_str("* Code excerpts come from the analyzed sources; check the files listed under each chapter for the full picture.\n");
        out.push_str("* Ask follow-up questions with `lore ask`, which can read source files on demand.\n\n");

        let metadata = DocumentMetadata {
            lore: MetadataBody {
                version: DOCUMENT_VERSION,
                project: self.project.clone(),
                generated_at: self.generated_at,
                fingerprint: self.fingerprint.clone(),
                files: self.files.clone(),
                abstractions: self.abstractions.clone(),
                relationships: self.relationships.clone(),
                order: self.order.clone(),
            },
        };
        // Serializing plain data structures cannot fail
        let yaml = serde_yaml::to_string(&metadata).unwrap_or_default();
        out.push_str(METADATA_START);
        out.push_str("\n\n```yaml\n");
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n\n");
        out.push_str(METADATA_END);
        out.push('\n');

        out
    }
}
