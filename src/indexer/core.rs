use super::IndexError;
use super::code_parser::{Chunk, Chunker};
use super::scoring::{ScoringMode, ScoringStrategy};
use super::walk::source_files;
use crate::db::Db;
use crate::db::models::IndexedEntry;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub files_indexed: usize,
    pub chunks: usize,
    /// Files skipped because they could not be read or parsed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub file_path: String,
    pub line_range: [usize; 2],
    pub symbol: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub mode: ScoringMode,
    pub results: Vec<SearchHit>,
}

/// Symbol-level search over one repository.
///
/// Builds compute the new entry set without holding any lock, then swap it in
/// under the write guard, so queries see either the old or the new index.
pub struct SemanticIndex {
    scorer: Box<dyn ScoringStrategy>,
    exclude_dirs: Vec<String>,
    entries: RwLock<Vec<IndexedEntry>>,
    db: Option<Mutex<Db>>,
    build_lock: Mutex<()>,
}

impl SemanticIndex {
    pub fn new(scorer: Box<dyn ScoringStrategy>) -> Self {
        Self {
            scorer,
            exclude_dirs: Vec::new(),
            entries: RwLock::new(Vec::new()),
            db: None,
            build_lock: Mutex::new(()),
        }
    }

    /// Back the index with a database; entries from an earlier build are
    /// loaded when they were produced by an identical scorer (same mode,
    /// embedder, and dimension count).
    pub fn with_db(scorer: Box<dyn ScoringStrategy>, db: Db) -> Result<Self, IndexError> {
        let fingerprint = scorer.fingerprint();
        let mut index = Self::new(scorer);

        match db.stored_scorer()? {
            Some(stored) if stored == fingerprint => {
                let entries = db.load_entries()?;
                info!("Loaded {} persisted index entries", entries.len());
                *index.entries.get_mut() = entries;
            }
            Some(stored) => {
                warn!("Ignoring persisted index built with {stored} (active: {fingerprint})");
            }
            None => {}
        }

        index.db = Some(Mutex::new(db));
        Ok(index)
    }

    pub fn with_excludes(mut self, exclude_dirs: Vec<String>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    pub fn mode(&self) -> ScoringMode {
        self.scorer.mode()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Re-chunk every source file under `root` and replace the whole index.
    pub fn build<P: AsRef<Path>>(&self, root: P) -> Result<BuildStats, IndexError> {
        let root = root.as_ref();
        let _guard = self.build_lock.lock();

        if !root.is_dir() {
            warn!("Repository root {} is not a directory", root.display());
        }

        let mut chunker = Chunker::new()?;
        let mut stats = BuildStats::default();
        let mut chunks: Vec<Chunk> = Vec::new();

        for file in source_files(root, &self.exclude_dirs) {
            match chunker.chunk_file(&file.path, &file.rel_path) {
                Ok(file_chunks) => {
                    debug!("{}: {} chunks", file.rel_path, file_chunks.len());
                    chunks.extend(file_chunks);
                    stats.files_indexed += 1;
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", file.rel_path);
                    stats.failed += 1;
                }
            }
        }

        let documents: Vec<String> = chunks.iter().map(Chunk::document).collect();
        let doc_refs: Vec<&str> = documents.iter().map(String::as_str).collect();
        let vectors = self.scorer.encode(&doc_refs)?;

        let entries: Vec<IndexedEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedEntry::from_chunk(chunk, vector))
            .collect();
        stats.chunks = entries.len();

        if let Some(db) = &self.db {
            db.lock().replace_entries(&self.scorer.fingerprint(), &entries)?;
        }
        *self.entries.write() = entries;

        info!(
            "Indexed {} files ({} chunks, {} skipped) from {}",
            stats.files_indexed,
            stats.chunks,
            stats.failed,
            root.display()
        );
        Ok(stats)
    }

    /// Top `top_k` entries for `text`, best first.
    ///
    /// Equal scores keep insertion order. An empty index yields no results.
    pub fn query(&self, text: &str, top_k: usize) -> Result<QueryResponse, IndexError> {
        let entries = self.entries.read();

        let mut scored: Vec<(usize, f64)> = self
            .scorer
            .score(text, &entries)?
            .into_iter()
            .enumerate()
            .filter_map(|(i, score)| score.map(|s| (i, s)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        let results = scored
            .into_iter()
            .map(|(i, score)| {
                let meta = &entries[i].metadata;
                SearchHit {
                    file_path: meta.file_path.clone(),
                    line_range: [meta.start_line, meta.end_line],
                    symbol: meta.symbol.clone(),
                    score,
                }
            })
            .collect();

        Ok(QueryResponse {
            query: text.to_string(),
            mode: self.mode(),
            results,
        })
    }

    /// Snapshot of the stored entries, in insertion order.
    pub fn entries(&self) -> Vec<IndexedEntry> {
        self.entries.read().clone()
    }
}
