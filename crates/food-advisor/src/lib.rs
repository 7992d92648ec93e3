pub mod config;
pub mod error;
pub mod ingest;
pub mod literal;
pub mod llm;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod search;
pub mod server;
pub mod synthesizer;
