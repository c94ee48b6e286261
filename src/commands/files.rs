//! `lore files`: show what the file store admits, with stable indices.

use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

use super::common::{load_config, open_store, SourceSpec};
use crate::store::FileStore;

pub fn execute(source: SourceSpec, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&source, &config)?;
    list_files(store.as_ref(), &mut io::stdout())?;
    Ok(())
}

pub fn list_files<S: FileStore + ?Sized, W: Write>(store: &S, output: &mut W) -> io::Result<()> {
    let files = store.list();
    let width = files.len().saturating_sub(1).to_string().len();
    for file in files {
        writeln!(
            output,
            "{:>width$}  {:>9}  {}",
            file.index,
            format_size(file.size()),
            file.path
        )?;
    }
    let total: usize = files.iter().map(|f| f.size()).sum();
    writeln!(
        output,
        "\n{} {} files, {} from {}",
        "─".dimmed(),
        files.len(),
        format_size(total),
        store.location()
    )?;
    Ok(())
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_list_example_files() {
        let mut output = Vec::new();
        list_files(&MemoryStore::example(), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("0  "));
        assert!(lines[0].ends_with("data_processor.py"));
        assert!(lines[2].ends_with("visualization.py"));
        assert!(text.contains("3 files"));
    }
}
