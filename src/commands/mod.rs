pub mod ask;
pub mod build;
pub mod common;
pub mod completions;
pub mod files;
