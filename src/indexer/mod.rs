//! Source parsing and the semantic index.
pub mod code_parser;
pub mod core;
pub mod languages;
pub mod relations;
pub mod scoring;
pub mod walk;

use crate::embedder::EmbedderError;
use thiserror::Error;

/// Errors raised while turning source text into a syntax tree.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("invalid query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("parser produced no tree for {0}")]
    NoTree(String),

    #[error("syntax error in {path} at line {line}")]
    Syntax { path: String, line: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort an index build or query.
///
/// Per-file parse failures are not among them; builds skip those files.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("parser setup failed: {0}")]
    Parser(#[from] ParseError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedderError),

    #[error("index store error: {0}")]
    Store(#[from] rusqlite::Error),
}
