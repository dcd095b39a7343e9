//! Core logic: parsing, indexing, graph traversal, expansion, validation, execution.

pub mod ast;
pub mod error;
pub mod executor;
pub mod graph;
pub mod indexer;
pub mod loader;
pub mod parser;
pub mod recipe;
pub mod stdlib;
pub mod types;
pub mod validation;
