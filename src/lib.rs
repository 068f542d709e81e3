pub mod config;
pub mod evaluation;
pub mod ledger;
pub mod llm;
pub mod scoring;
pub mod server;
pub mod types;
