//! Abstraction extraction: one reasoning call, validated, with a single
//! corrective retry.

use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::{BuildStage, LoreError, Result};
use crate::models::{Abstraction, SourceFile};
use crate::reasoning::response::{extract_yaml_block, leading_index};
use crate::reasoning::Reasoner;

/// Extraction calls made before the build gives up on an invalid response.
pub const MAX_EXTRACTION_ATTEMPTS: u32 = 2;

/// File names that mark a conventional program entry point.
pub const ENTRY_POINT_FILES: &[&str] = &[
    "main.rs",
    "lib.rs",
    "main.py",
    "app.py",
    "__main__.py",
    "manage.py",
    "index.ts",
    "index.js",
    "main.ts",
    "main.js",
    "App.tsx",
    "App.jsx",
    "main.go",
    "Main.java",
    "Program.cs",
    "main.c",
    "main.cpp",
];

pub fn is_entry_point(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    ENTRY_POINT_FILES.contains(&file_name)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIndex {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawAbstraction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "files")]
    file_indices: Vec<RawIndex>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    List(Vec<RawAbstraction>),
    Wrapped { abstractions: Vec<RawAbstraction> },
}

/// Parse and check an extraction response against the file count.
///
/// Every problem found is reported so the corrective prompt can name them all.
pub fn validate_response(
    response: &str,
    file_count: usize,
    max_abstractions: usize,
) -> std::result::Result<Vec<Abstraction>, Vec<String>> {
    let yaml = extract_yaml_block(response);
    let raw: RawResponse = serde_yaml::from_str(yaml)
        .map_err(|e| vec![format!("response is not a YAML list of abstractions: {e}")])?;
    let raw = match raw {
        RawResponse::List(list) | RawResponse::Wrapped { abstractions: list } => list,
    };

    let mut problems = Vec::new();
    if raw.is_empty() {
        problems.push("no abstractions were listed".to_string());
    }
    if raw.len() > max_abstractions {
        problems.push(format!(
            "{} abstractions listed, at most {max_abstractions} allowed",
            raw.len()
        ));
    }

    let mut abstractions = Vec::with_capacity(raw.len());
    for (position, item) in raw.into_iter().enumerate() {
        let name = item.name.trim().to_string();
        let label = if name.is_empty() {
            format!("abstraction #{position}")
        } else {
            format!("'{name}'")
        };
        if name.is_empty() {
            problems.push(format!("{label} has no name"));
        }

        let mut indices = BTreeSet::new();
        for raw_index in &item.file_indices {
            let parsed = match raw_index {
                RawIndex::Number(n) => usize::try_from(*n).ok(),
                RawIndex::Text(text) => leading_index(text),
            };
            match parsed {
                Some(idx) if idx < file_count => {
                    indices.insert(idx);
                }
                Some(idx) => problems.push(format!(
                    "{label} references file index {idx}, valid indices are 0..{}",
                    file_count.saturating_sub(1)
                )),
                None => problems.push(format!("{label} has an unreadable file index {raw_index:?}")),
            }
        }
        if item.file_indices.is_empty() {
            problems.push(format!("{label} lists no file indices"));
        }

        abstractions.push(Abstraction {
            name,
            description: item.description.trim().to_string(),
            file_indices: indices,
            entry_point: false,
        });
    }

    if problems.is_empty() {
        Ok(abstractions)
    } else {
        Err(problems)
    }
}

fn extraction_prompt(
    project: &str,
    files: &[SourceFile],
    config: &BuildConfig,
    problems: &[String],
) -> String {
    let mut context = String::new();
    let mut used = 0usize;
    let mut omitted = 0usize;
    for file in files {
        if used + file.size() <= config.prompt_chars {
            context.push_str(&format!(
                "--- File Index {}: {} ---\n{}\n\n",
                file.index, file.path, file.content
            ));
            used += file.size();
        } else {
            context.push_str(&format!(
                "--- File Index {}: {} (content omitted) ---\n\n",
                file.index, file.path
            ));
            omitted += 1;
        }
    }
    if omitted > 0 {
        debug!(omitted, budget = config.prompt_chars, "file contents omitted from extraction prompt");
    }

    let file_listing: Vec<String> = files
        .iter()
        .map(|f| format!("- {} # {}", f.index, f.path))
        .collect();
    let max = config.max_abstractions.max(1);
    let min = config.min_abstractions.clamp(1, max);

    let mut prompt = format!(
        r#"For the project `{project}`:

Codebase context:
{context}
Analyze the codebase context above.
Identify the top {min}-{max} core abstractions that a newcomer needs to understand the code.

For each abstraction provide:
1. A concise `name`.
2. A beginner-friendly `description` of what it is and why it exists, in around 100 words.
3. The `file_indices` of the files that implement it, as integers from the list below.

File indices:
{listing}

Format the output as a YAML list:

```yaml
- name: Query Processing
  description: |
    Explains what the abstraction does.
  file_indices:
    - 0 # path/to/file1.py
    - 3 # path/to/another.js
```

List at most {max} abstractions. Every abstraction needs at least one valid file index."#,
        listing = file_listing.join("\n"),
    );

    if !problems.is_empty() {
        prompt.push_str("\n\nYour previous answer was rejected for these reasons:\n");
        for problem in problems {
            prompt.push_str(&format!("- {problem}\n"));
        }
        prompt.push_str(&format!(
            "Only use file indices between 0 and {}. Reply with the corrected YAML list only.\n",
            files.len().saturating_sub(1)
        ));
    }
    prompt
}

/// Identify the codebase's key abstractions.
///
/// An invalid response gets exactly one corrective retry; a second invalid
/// response fails the build with [`LoreError::ExtractionValidation`].
pub fn extract_abstractions<R: Reasoner + ?Sized>(
    reasoner: &R,
    project: &str,
    files: &[SourceFile],
    config: &BuildConfig,
) -> Result<Vec<Abstraction>> {
    let mut problems: Vec<String> = Vec::new();

    for attempt in 1..=MAX_EXTRACTION_ATTEMPTS {
        let prompt = extraction_prompt(project, files, config, &problems);
        debug!(attempt, prompt_chars = prompt.len(), "requesting abstractions");
        let response = reasoner
            .complete(&prompt)
            .map_err(|source| LoreError::ReasoningFailed {
                stage: BuildStage::Extraction,
                source,
            })?;

        match validate_response(&response, files.len(), config.max_abstractions.max(1)) {
            Ok(mut abstractions) => {
                for abstraction in &mut abstractions {
                    abstraction.entry_point = abstraction
                        .file_indices
                        .iter()
                        .any(|&idx| is_entry_point(&files[idx].path));
                }
                info!(count = abstractions.len(), attempt, "abstractions extracted");
                return Ok(abstractions);
            }
            Err(found) => {
                warn!(attempt, problems = found.len(), "extraction response rejected");
                problems = found;
            }
        }
    }

    Err(LoreError::ExtractionValidation {
        attempts: MAX_EXTRACTION_ATTEMPTS,
        problems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ScriptedReasoner;
    use proptest::prelude::*;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new(0, "data_processor.py", "class DataProcessor: pass"),
            SourceFile::new(1, "main_app.py", "def main(): pass"),
            SourceFile::new(2, "visualization.py", "class Visualizer: pass"),
        ]
    }

    const VALID: &str = r#"```yaml
- name: Processing
  description: Transforms data.
  file_indices:
    - 0 # data_processor.py
- name: App
  description: Entry.
  file_indices: [1, "2 # visualization.py"]
```"#;

    #[test]
    fn test_valid_response() {
        let abstractions = validate_response(VALID, 3, 10).unwrap();
        assert_eq!(abstractions.len(), 2);
        assert_eq!(abstractions[1].file_indices, BTreeSet::from([1, 2]));
        assert_eq!(abstractions[0].description, "Transforms data.");
    }

    #[test]
    fn test_wrapped_response() {
        let response = "abstractions:\n  - name: A\n    description: d\n    file_indices: [0]\n";
        assert_eq!(validate_response(response, 1, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_and_empty() {
        let response = "- name: A\n  description: d\n  file_indices: [7]\n- name: B\n  description: d\n  file_indices: []\n";
        let problems = validate_response(response, 3, 10).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("file index 7")));
        assert!(problems.iter().any(|p| p.contains("no file indices")));
    }

    #[test]
    fn test_rejects_too_many() {
        let problems = validate_response(VALID, 3, 1).unwrap_err();
        assert!(problems[0].contains("at most 1"));
    }

    #[test]
    fn test_entry_point_detection() {
        assert!(is_entry_point("src/main.rs"));
        assert!(!is_entry_point("main_app.py"));
        assert!(is_entry_point("pkg/__main__.py"));
    }

    #[test]
    fn test_retry_with_corrective_note() {
        let bad = "- name: A\n  description: d\n  file_indices: [9]\n";
        let stub = ScriptedReasoner::from_texts([bad, VALID]);
        let abstractions =
            extract_abstractions(&stub, "demo", &files(), &BuildConfig::default()).unwrap();
        assert_eq!(abstractions.len(), 2);
        assert_eq!(stub.calls(), 2);
        let prompts = stub.prompts();
        assert!(!prompts[0].contains("previous answer was rejected"));
        assert!(prompts[1].contains("previous answer was rejected"));
        assert!(prompts[1].contains("file index 9"));
    }

    #[test]
    fn test_second_invalid_response_fails() {
        let bad = "- name: A\n  description: d\n  file_indices: [9]\n";
        let stub = ScriptedReasoner::from_texts([bad, bad, VALID]);
        let err = extract_abstractions(&stub, "demo", &files(), &BuildConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LoreError::ExtractionValidation { attempts: 2, .. }
        ));
        assert_eq!(stub.calls(), 2);
    }

    #[test]
    fn test_prompt_respects_content_budget() {
        let config = BuildConfig {
            prompt_chars: 30,
            ..BuildConfig::default()
        };
        let prompt = extraction_prompt("demo", &files(), &config, &[]);
        assert!(prompt.contains("class DataProcessor"));
        assert!(prompt.contains("--- File Index 2: visualization.py (content omitted) ---"));
    }

    proptest! {
        #[test]
        fn accepted_indices_are_always_in_range(
            file_count in 1usize..8,
            groups in prop::collection::vec(prop::collection::vec(0i64..12, 1..4), 1..5),
        ) {
            let mut response = String::new();
            for (i, group) in groups.iter().enumerate() {
                let indices: Vec<String> = group.iter().map(|n| n.to_string()).collect();
                response.push_str(&format!(
                    "- name: A{i}\n  description: d\n  file_indices: [{}]\n",
                    indices.join(", ")
                ));
            }
            let any_out_of_range = groups.iter().flatten().any(|&n| n as usize >= file_count);
            match validate_response(&response, file_count, 10) {
                Ok(abstractions) => {
                    prop_assert!(!any_out_of_range);
                    for abstraction in abstractions {
                        prop_assert!(!abstraction.file_indices.is_empty());
                        prop_assert!(abstraction.file_indices.iter().all(|&i| i < file_count));
                    }
                }
                Err(problems) => {
                    prop_assert!(any_out_of_range);
                    prop_assert!(!problems.is_empty());
                }
            }
        }
    }
}
