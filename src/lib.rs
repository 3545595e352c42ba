//! # bugscope — code intelligence for bug-fixing agents
//!
//! Locates relevant source for a bug description, finds the files impacted by
//! a change, and rewrites a single function body into a reviewable diff.
//!
//! ## Architecture
//!
//! - **[`indexer`]** — Tree-sitter symbol chunking, import extraction, and the semantic index
//! - **[`embedder`]** — Deterministic text embedding (token hashing)
//! - **[`db`]** — Optional SQLite persistence for index entries
//! - **[`graph`]** — File-level import graph with transitive dependents
//! - **[`patch`]** — Structural function-body rewrites with a text fallback
//! - **[`fs_tools`]** — Read/write helpers for persisting patch output
//! - **[`config`]** — Configuration loading and validation
//! - **[`context`]** — Per-repository instance bundle

pub mod config;
pub mod context;
pub mod db;
pub mod embedder;
pub mod fs_tools;
pub mod graph;
pub mod indexer;
pub mod patch;

pub use context::CodeIntel;
