//! Helpers for pulling structured payloads out of free-form responses.

/// Extract the body of the first fenced YAML block.
///
/// Falls back to the first untagged fence, then to the whole response.
pub fn extract_yaml_block(response: &str) -> &str {
    for opener in ["```yaml", "```yml", "```"] {
        if let Some(start) = response.find(opener) {
            let body_start = start + opener.len();
            let rest = &response[body_start..];
            // The opener line may carry trailing text; content starts after it
            let rest = match rest.find('\n') {
                Some(nl) if rest[..nl].trim().is_empty() => &rest[nl + 1..],
                _ => rest,
            };
            if let Some(end) = rest.find("```") {
                return rest[..end].trim();
            }
        }
    }
    response.trim()
}

/// Parse a leading integer from values like `3`, `"3"` or `"3 # src/app.py"`.
///
/// The digits must end the value or be followed by whitespace or `#`, so names
/// such as `2D Overlay` are not read as positions.
pub fn leading_index(text: &str) -> Option<usize> {
    let text = text.trim();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    match text[end..].chars().next() {
        None => {}
        Some(c) if c.is_whitespace() || c == '#' => {}
        Some(_) => return None,
    }
    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_yaml_block() {
        let response = "Here you go:\n```yaml\n- name: A\n```\nthanks";
        assert_eq!(extract_yaml_block(response), "- name: A");
    }

    #[test]
    fn test_extract_plain_fence() {
        let response = "```\nsummary: hi\n```";
        assert_eq!(extract_yaml_block(response), "summary: hi");
    }

    #[test]
    fn test_extract_without_fence() {
        assert_eq!(extract_yaml_block("  summary: hi \n"), "summary: hi");
    }

    #[test]
    fn test_leading_index() {
        assert_eq!(leading_index("3"), Some(3));
        assert_eq!(leading_index(" 12 # src/app.py"), Some(12));
        assert_eq!(leading_index("Parser"), None);
        assert_eq!(leading_index("4#main.py"), Some(4));
    }

    #[test]
    fn test_leading_index_needs_a_terminator() {
        assert_eq!(leading_index("12abc"), None);
        assert_eq!(leading_index("2D Overlay"), None);
        assert_eq!(leading_index("3.5"), None);
    }
}
