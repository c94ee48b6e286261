//! Relationship mapping and the project summary.
//!
//! Best effort: edges that cannot be resolved are dropped with a warning, and
//! an unusable response still yields a summary.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::{BuildStage, LoreError, Result};
use crate::models::{Abstraction, Relationship, RelationshipWarning, SourceFile};
use crate::reasoning::response::{extract_yaml_block, leading_index};
use crate::reasoning::Reasoner;

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMap {
    pub summary: String,
    pub relationships: Vec<Relationship>,
    pub warnings: Vec<RelationshipWarning>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRef {
    Number(i64),
    Text(String),
}

impl RawRef {
    fn describe(&self) -> String {
        match self {
            RawRef::Number(n) => n.to_string(),
            RawRef::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    #[serde(alias = "from_abstraction")]
    from: RawRef,
    #[serde(alias = "to_abstraction")]
    to: RawRef,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct RawMap {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

/// Resolve a reference by name or by position (`1`, `"1 # Parser"`).
///
/// An exact name wins over a position, so `2D Overlay` names an abstraction.
fn resolve(reference: &RawRef, abstractions: &[Abstraction]) -> Option<usize> {
    match reference {
        RawRef::Number(n) => usize::try_from(*n).ok().filter(|&i| i < abstractions.len()),
        RawRef::Text(text) => {
            let wanted = text.trim().to_lowercase();
            if let Some(idx) = abstractions
                .iter()
                .position(|a| a.name.to_lowercase() == wanted)
            {
                return Some(idx);
            }
            leading_index(text).filter(|&idx| idx < abstractions.len())
        }
    }
}

/// Turn a raw response into a relationship map, never failing.
pub fn interpret_response(response: &str, abstractions: &[Abstraction]) -> RelationshipMap {
    let raw: RawMap = match serde_yaml::from_str(extract_yaml_block(response)) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "relationship response is not valid YAML, keeping it as summary");
            return RelationshipMap {
                summary: response.trim().to_string(),
                relationships: Vec::new(),
                warnings: vec![RelationshipWarning::Unparseable {
                    detail: e.to_string(),
                }],
            };
        }
    };

    let mut relationships = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for edge in raw.relationships {
        let label = edge.label.trim().to_string();
        let from = resolve(&edge.from, abstractions);
        let to = resolve(&edge.to, abstractions);
        match (from, to) {
            (Some(from), Some(to)) if from == to => {
                warnings.push(RelationshipWarning::SelfLoop {
                    abstraction: abstractions[from].name.clone(),
                    label,
                });
            }
            (Some(from), Some(to)) => {
                if seen.insert((from, to)) {
                    relationships.push(Relationship { from, to, label });
                }
            }
            (None, _) => warnings.push(RelationshipWarning::Unresolved {
                reference: edge.from.describe(),
                label,
            }),
            (_, None) => warnings.push(RelationshipWarning::Unresolved {
                reference: edge.to.describe(),
                label,
            }),
        }
    }

    for warning in &warnings {
        warn!("{warning}");
    }
    if raw.summary.trim().is_empty() {
        warn!("relationship response carried no project summary");
    }

    RelationshipMap {
        summary: raw.summary.trim().to_string(),
        relationships,
        warnings,
    }
}

fn relationship_prompt(project: &str, abstractions: &[Abstraction], files: &[SourceFile]) -> String {
    let mut listing = String::new();
    for (idx, abstraction) in abstractions.iter().enumerate() {
        let paths: Vec<&str> = abstraction
            .file_indices
            .iter()
            .filter_map(|&i| files.get(i).map(|f| f.path.as_str()))
            .collect();
        listing.push_str(&format!(
            "- Index {idx}: {}\n  Description: {}\n  Files: {}\n",
            abstraction.name,
            abstraction.description,
            paths.join(", ")
        ));
    }

    format!(
        r#"Based on the following abstractions of the project `{project}`:

{listing}
Please provide:
1. A high-level `summary` of the project's main purpose and functionality in a few beginner-friendly sentences.
2. A list (`relationships`) describing the key interactions between these abstractions. For each relationship give:
   - `from_abstraction`: index of the source abstraction (e.g. `0 # Name`)
   - `to_abstraction`: index of the target abstraction (e.g. `1 # Name`)
   - `label`: a brief label for the interaction, in just a few words (e.g. "Manages", "Uses")
   Read an edge as "from uses or depends on to". Do not relate an abstraction to itself.

Format the output as YAML:

```yaml
summary: |
  A brief explanation of the project.
relationships:
  - from_abstraction: 0 # AbstractionName1
    to_abstraction: 1 # AbstractionName2
    label: "Manages"
```"#
    )
}

/// Ask for the project summary and the relationships between abstractions.
pub fn map_relationships<R: Reasoner + ?Sized>(
    reasoner: &R,
    project: &str,
    abstractions: &[Abstraction],
    files: &[SourceFile],
) -> Result<RelationshipMap> {
    let prompt = relationship_prompt(project, abstractions, files);
    let response = reasoner
        .complete(&prompt)
        .map_err(|source| LoreError::ReasoningFailed {
            stage: BuildStage::Relationships,
            source,
        })?;

    let map = interpret_response(&response, abstractions);
    info!(
        relationships = map.relationships.len(),
        dropped = map.warnings.len(),
        "relationships mapped"
    );
    Ok(map)
}
