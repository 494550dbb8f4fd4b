pub mod cli;
pub mod config;
pub mod constants;
pub mod entrez;
pub mod error;
pub mod export;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod rate_limiter;
pub mod types;

// Port traits and their concrete adapters
pub mod app;
pub mod infra;
