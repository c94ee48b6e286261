use std::path::Path;

/// Truncate a string safely by character count, not byte count.
/// This ensures we don't break UTF-8 encoding by cutting mid-character.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Normalize a path for store lookups: `/` separators, no leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Relative path of `path` under `root` in store form.
pub fn relative_store_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(normalize_path(&relative.to_string_lossy()))
}

/// Last path segment of a location, without a `.git` suffix.
///
/// Used to name the project after its directory or repository.
pub fn project_name(location: &str) -> String {
    let trimmed = location.trim_end_matches('/').trim_end_matches(".git");
    trimmed
        .rsplit(['/', '\\', ':'])
        .find(|s| !s.is_empty() && *s != ".")
        .unwrap_or("codebase")
        .to_string()
}
