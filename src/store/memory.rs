//! In-memory store for synthetic codebases and tests.

use super::{FileFilter, FileStore, Snapshot, StoreError};
use crate::error::{LoreError, Result};
use crate::models::SourceFile;
use crate::utils::normalize_path;

#[derive(Debug, Clone)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    /// Build a store from (path, content) pairs, applying `filter`.
    pub fn new<P, C>(
        location: &str,
        files: impl IntoIterator<Item = (P, C)>,
        filter: &FileFilter,
    ) -> Result<Self>
    where
        P: Into<String>,
        C: Into<String>,
    {
        let entries: Vec<(String, String)> = files
            .into_iter()
            .map(|(p, c)| (normalize_path(&p.into()), c.into()))
            .filter(|(path, content)| {
                filter.admits_path(path) && filter.admits_size(content.len() as u64)
            })
            .collect();

        if entries.is_empty() {
            return Err(LoreError::SourceUnavailable(format!(
                "no source files in {location}"
            )));
        }

        Ok(Self {
            snapshot: Snapshot::new(location, entries),
        })
    }

    /// The small three-file application used by `lore build --example`.
    pub fn example() -> Self {
        let files = [
            ("data_processor.py", EXAMPLE_DATA_PROCESSOR),
            ("visualization.py", EXAMPLE_VISUALIZATION),
            ("main_app.py", EXAMPLE_MAIN_APP),
        ];
        let entries = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        Self {
            snapshot: Snapshot::new("built-in example", entries),
        }
    }
}

impl FileStore for MemoryStore {
    fn location(&self) -> &str {
        self.snapshot.location()
    }

    fn list(&self) -> &[SourceFile] {
        self.snapshot.files()
    }

    fn read(&self, path: &str) -> std::result::Result<&str, StoreError> {
        self.snapshot.read(path)
    }
}

const EXAMPLE_DATA_PROCESSOR: &str = r#"class DataLoader:
    def __init__(self, filename):
        self.filename = filename

    def load_data(self):
        with open(self.filename, 'r') as f:
            return f.read()


class DataProcessor:
    def __init__(self, data):
        self.data = data

    def process(self):
        return self.data.upper()
"#;

const EXAMPLE_VISUALIZATION: &str = r#"class Visualizer:
    def __init__(self, data):
        self.data = data

    def create_chart(self, chart_type):
        print(f"Creating {chart_type} chart with {self.data[:10]}...")
"#;

const EXAMPLE_MAIN_APP: &str = r#"from data_processor import DataLoader, DataProcessor
from visualization import Visualizer


class Application:
    def __init__(self, config):
        self.config = config

    def run(self):
        loader = DataLoader(self.config['input_file'])
        data = loader.load_data()

        processor = DataProcessor(data)
        processed_data = processor.process()

        visualizer = Visualizer(processed_data)
        visualizer.create_chart(self.config['chart_type'])


if __name__ == "__main__":
    app = Application({'input_file': 'data.txt', 'chart_type': 'bar'})
    app.run()
"#;
