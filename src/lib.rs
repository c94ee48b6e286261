pub mod agent;
pub mod cancel;
pub mod commands;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reasoning;
pub mod retry;
pub mod store;
pub mod utils;
