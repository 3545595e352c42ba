use super::ParseError;
use super::languages::{LanguageConfig, parse_strict};
use std::collections::BTreeSet;
use tree_sitter::{Parser, Query, QueryCursor, StreamingIterator};

/// One import statement, already mapped onto a repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRelation {
    /// Dotted module name as written (`pkg.sub`).
    pub module: String,
    /// Path-shaped target (`pkg/sub.py`).
    pub target_file: String,
    pub source_line: usize,
}

/// Module recorded for `from __future__ import ...`.
pub const FUTURE_MODULE: &str = "__future__";

/// Turn `pkg.sub` into `pkg/sub.py`.
pub fn module_to_path(module: &str) -> String {
    format!("{}.py", module.replace('.', "/"))
}

pub struct ImportExtractor {
    parser: Parser,
    query: Query,
}

impl ImportExtractor {
    pub fn new() -> Result<Self, ParseError> {
        let config = LanguageConfig::python();
        let query = Query::new(&config.language, config.import_query)?;
        let parser = config.parser()?;
        Ok(Self { parser, query })
    }

    /// Extract every import in `content`, at any nesting depth, in source order.
    ///
    /// Duplicate modules are reported once.
    pub fn extract_imports(
        &mut self,
        content: &str,
        source_file: &str,
    ) -> Result<Vec<ImportRelation>, ParseError> {
        let tree = parse_strict(&mut self.parser, content, source_file)?;
        let source = content.as_bytes();

        let capture_names = self.query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut relations = Vec::new();
        let mut seen = BTreeSet::new();

        let mut matches = cursor.matches(&self.query, tree.root_node(), source);
        while let Some(m) = matches.next() {
            for cap in m.captures {
                let module: String = if capture_names[cap.index as usize] == "future" {
                    FUTURE_MODULE.to_string()
                } else {
                    let Ok(name) = cap.node.utf8_text(source) else {
                        continue;
                    };
                    // dotted_name may contain whitespace around dots in odd formatting
                    name.split_whitespace().collect()
                };
                if module.is_empty() || !seen.insert(module.clone()) {
                    continue;
                }
                relations.push(ImportRelation {
                    target_file: module_to_path(&module),
                    source_line: cap.node.start_position().row + 1,
                    module,
                });
            }
        }

        relations.sort_by_key(|r| r.source_line);
        Ok(relations)
    }
}
