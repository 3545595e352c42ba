use crate::indexer::code_parser::Chunk;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol: String,
}

/// A stored index row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub id: String,
    pub document: String,
    pub metadata: EntryMetadata,
    /// Empty when the lexical scorer is active.
    pub embedding: Vec<f32>,
}

impl IndexedEntry {
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            document: chunk.document(),
            metadata: EntryMetadata {
                file_path: chunk.file_path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                symbol: chunk.symbol.clone(),
            },
            embedding,
        }
    }
}
