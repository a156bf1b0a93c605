pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod types;

// Collaborator boundaries and their adapters
pub mod app;
pub mod infra;
