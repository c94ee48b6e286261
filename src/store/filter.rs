//! Include/exclude and size filtering applied before content is kept.

use glob::{MatchOptions, Pattern, PatternError};

/// Default per-file byte cap (1 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Directories never descended into.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    "target",
];

/// Binary, media, archive and generated files excluded on top of user patterns.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "*.pyc", "*.pyo", "*.so", "*.obj", "*.o", "*.a", "*.dll", "*.exe", "*.bin", "*.dat",
    "*.class", "*.jar", "*.png", "*.jpg", "*.jpeg", "*.gif", "*.ico", "*.svg", "*.pdf",
    "*.woff", "*.woff2", "*.ttf", "*.mp3", "*.mp4", "*.avi", "*.mov", "*.zip", "*.tar",
    "*.gz", "*.rar", "*.7z", "*.log", "*.lock",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    max_file_bytes: u64,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: compile(DEFAULT_EXCLUDES).unwrap_or_default(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl FileFilter {
    /// Build a filter from user patterns. Default excludes are always added.
    pub fn new<S: AsRef<str>>(
        include: &[S],
        exclude: &[S],
        max_file_bytes: u64,
    ) -> Result<Self, PatternError> {
        let mut exclude_patterns = compile(DEFAULT_EXCLUDES)?;
        exclude_patterns.extend(compile(exclude)?);
        Ok(Self {
            include: compile(include)?,
            exclude: exclude_patterns,
            max_file_bytes,
        })
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Whether a store-relative path passes hidden-file, include and exclude rules.
    pub fn admits_path(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        if path
            .split('/')
            .any(|part| part.starts_with('.') || SKIP_DIRS.contains(&part))
        {
            return false;
        }
        if self.exclude.iter().any(|p| matches(p, path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| matches(p, path))
    }

    pub fn admits_size(&self, bytes: u64) -> bool {
        bytes <= self.max_file_bytes
    }
}

/// Patterns match either the full relative path or the bare file name,
/// so `*.py` and `src/*.py` both behave as users expect.
fn matches(pattern: &Pattern, path: &str) -> bool {
    if pattern.matches_with(path, MATCH_OPTIONS) {
        return true;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name != path && pattern.matches_with(file_name, MATCH_OPTIONS)
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p.as_ref())).collect()
}

/// Whether a string should be treated as a glob rather than a literal path.
pub fn is_glob(candidate: &str) -> bool {
    candidate.contains(['*', '?', '['])
}

/// Paths from `paths` matching a glob, in the order given.
pub fn match_paths<'a>(
    pattern: &str,
    paths: impl Iterator<Item = &'a str>,
) -> Result<Vec<&'a str>, PatternError> {
    let compiled = Pattern::new(pattern.trim())?;
    Ok(paths.filter(|path| matches(&compiled, path)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let filter = FileFilter::default();
        assert!(filter.admits_path("src/main.rs"));
        assert!(filter.admits_path("app.py"));
        assert!(!filter.admits_path("assets/logo.png"));
        assert!(!filter.admits_path(".env"));
        assert!(!filter.admits_path("src/.hidden/config.py"));
        assert!(!filter.admits_path("node_modules/left-pad/index.js"));
        assert!(!filter.admits_path("Cargo.lock"));
    }

    #[test]
    fn test_include_restricts() {
        let filter = FileFilter::new(&["*.py"], &[], DEFAULT_MAX_FILE_BYTES).unwrap();
        assert!(filter.admits_path("pkg/module.py"));
        assert!(!filter.admits_path("pkg/module.rs"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter =
            FileFilter::new(&["*.py"], &["tests/*"], DEFAULT_MAX_FILE_BYTES).unwrap();
        assert!(filter.admits_path("pkg/module.py"));
        assert!(!filter.admits_path("tests/unit/test_module.py"));
    }

    #[test]
    fn test_size_cap() {
        let filter = FileFilter::new::<&str>(&[], &[], 10).unwrap();
        assert!(filter.admits_size(10));
        assert!(!filter.admits_size(11));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FileFilter::new(&["[unclosed"], &[], 10).is_err());
    }

    #[test]
    fn test_match_paths() {
        let paths = ["a.py", "src/b.py", "src/c.rs"];
        let matched = match_paths("*.py", paths.iter().copied()).unwrap();
        assert_eq!(matched, vec!["a.py", "src/b.py"]);
        let matched = match_paths("src/*.rs", paths.iter().copied()).unwrap();
        assert_eq!(matched, vec!["src/c.rs"]);
        assert!(is_glob("*.py"));
        assert!(!is_glob("main.py"));
    }
}
