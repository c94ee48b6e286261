use super::render::{
    begin_marker, chapter_section, end_marker, DocumentMetadata, METADATA_END, METADATA_START,
};
use super::{KnowledgeDocument, DOCUMENT_VERSION};
use crate::error::{LoreError, Result};
use crate::models::Chapter;

fn malformed(msg: impl Into<String>) -> LoreError {
    LoreError::MalformedDocument(msg.into())
}

/// Pull the YAML out of the trailing metadata block.
///
/// Returns the body part of the document (everything before the block) and
/// the YAML text.
fn split_metadata(content: &str) -> Result<(&str, &str)> {
    let start = content
        .rfind(METADATA_START)
        .ok_or_else(|| malformed("no lore METADATA block found"))?;
    let body = &content[..start];
    let after = &content[start + METADATA_START.len()..];
    let end = after
        .find(METADATA_END)
        .ok_or_else(|| malformed("METADATA block is not terminated"))?;
    let block = &after[..end];

    let fence = block
        .find("```yaml")
        .ok_or_else(|| malformed("METADATA block has no yaml fence"))?;
    let yaml_start = fence + "```yaml".len();
    let yaml_len = block[yaml_start..]
        .rfind("```")
        .ok_or_else(|| malformed("METADATA yaml fence is not closed"))?;
    Ok((body, &block[yaml_start..yaml_start + yaml_len]))
}

/// Text between a section's begin and end markers, trimmed.
fn section<'a>(body: &'a str, name: &str) -> Result<&'a str> {
    let begin = begin_marker(name);
    let end = end_marker(name);
    let start = body
        .find(&begin)
        .ok_or_else(|| malformed(format!("section '{name}' is missing")))?
        + begin.len();
    let len = body[start..]
        .find(&end)
        .ok_or_else(|| malformed(format!("section '{name}' is not terminated")))?;
    Ok(body[start..start + len].trim())
}

impl KnowledgeDocument {
    /// Rebuild a document from its rendered markdown.
    pub fn parse(content: &str) -> Result<Self> {
        let (body, yaml) = split_metadata(content)?;
        let metadata: DocumentMetadata = serde_yaml::from_str(yaml)
            .map_err(|e| malformed(format!("invalid METADATA yaml: {e}")))?;
        let meta = metadata.lore;

        if meta.version > DOCUMENT_VERSION {
            return Err(malformed(format!(
                "document format version {} is newer than supported version {DOCUMENT_VERSION}",
                meta.version
            )));
        }

        let summary = section(body, "summary")?.to_string();
        let chapters = meta
            .order
            .iter()
            .enumerate()
            .map(|(position, abstraction_index)| {
                let sequence_number = position + 1;
                let content = section(body, &chapter_section(sequence_number))?;
                Ok(Chapter {
                    abstraction_index,
                    sequence_number,
                    content: content.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let document = KnowledgeDocument {
            project: meta.project,
            generated_at: meta.generated_at,
            fingerprint: meta.fingerprint,
            files: meta.files,
            summary,
            abstractions: meta.abstractions,
            relationships: meta.relationships,
            order: meta.order,
            chapters,
        };
        document.validate()?;
        Ok(document)
    }
}
