//! Filtering, indexing and fingerprinting of on-disk codebases.

use lore::error::LoreError;
use lore::store::{FileFilter, FileStore, LocalStore, StoreError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: impl AsRef<[u8]>) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "src/main.py", "import util\n");
    write(root, "src/util.py", "def helper(): ...\n");
    write(root, "README.md", "# Sample\n");
    write(root, ".git/config", "[core]\n");
    write(root, "node_modules/pkg/index.js", "module.exports = 1;\n");
    write(root, ".env", "SECRET=1\n");
    write(root, "docs/logo.png", "not really a png");
    write(root, "data/blob.py", [0xffu8, 0xfe, 0x00, 0x81]);
    write(root, "big.py", "x".repeat(2048));
    temp
}

fn paths(store: &impl FileStore) -> Vec<&str> {
    store.list().iter().map(|f| f.path.as_str()).collect()
}

#[test]
fn test_only_source_files_are_admitted() {
    let temp = sample_tree();
    let filter = FileFilter::new(&[] as &[&str], &[], 1024).unwrap();
    let store = LocalStore::open(temp.path(), &filter).unwrap();

    assert_eq!(paths(&store), vec!["README.md", "src/main.py", "src/util.py"]);
    for (i, file) in store.list().iter().enumerate() {
        assert_eq!(file.index, i);
    }
}

#[test]
fn test_reads_normalize_paths() {
    let temp = sample_tree();
    let store = LocalStore::open(temp.path(), &FileFilter::default()).unwrap();

    assert_eq!(store.read("./src/main.py").unwrap(), "import util\n");
    assert_eq!(store.read("src\\util.py").unwrap(), "def helper(): ...\n");
    assert_eq!(
        store.read("src/missing.py").unwrap_err(),
        StoreError::NotFound("src/missing.py".to_string())
    );
    // Present on disk but filtered out
    assert!(store.read(".env").is_err());
}

#[test]
fn test_include_and_exclude_patterns() {
    let temp = sample_tree();
    let include_py = FileFilter::new(&["*.py"], &[], 1024).unwrap();
    let store = LocalStore::open(temp.path(), &include_py).unwrap();
    assert_eq!(paths(&store), vec!["src/main.py", "src/util.py"]);

    let no_util = FileFilter::new(&[] as &[&str], &["src/util.py"], 1024).unwrap();
    let store = LocalStore::open(temp.path(), &no_util).unwrap();
    assert_eq!(paths(&store), vec!["README.md", "src/main.py"]);
}

#[test]
fn test_nothing_admitted_is_unavailable() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "image.png", "png");
    let err = LocalStore::open(temp.path(), &FileFilter::default()).unwrap_err();
    assert!(matches!(err, LoreError::SourceUnavailable(_)));

    let err = LocalStore::open(&temp.path().join("absent"), &FileFilter::default()).unwrap_err();
    assert!(matches!(err, LoreError::SourceUnavailable(_)));
}

#[test]
fn test_fingerprint_tracks_content() {
    let temp = sample_tree();
    let filter = FileFilter::default();
    let first = LocalStore::open(temp.path(), &filter).unwrap().fingerprint();
    let again = LocalStore::open(temp.path(), &filter).unwrap().fingerprint();
    assert_eq!(first, again);
    assert_eq!(first.len(), 64);

    write(temp.path(), "src/util.py", "def helper(): return 1\n");
    let edited = LocalStore::open(temp.path(), &filter).unwrap().fingerprint();
    assert_ne!(first, edited);
}

#[test]
fn test_location_is_reported() {
    let temp = sample_tree();
    let store = LocalStore::open_as(temp.path(), "https://example.com/acme/tool.git", &FileFilter::default())
        .unwrap();
    assert_eq!(store.location(), "https://example.com/acme/tool.git");
    assert_eq!(store.root(), temp.path());
}
