use super::ParseError;
use super::languages::{LanguageConfig, parse_strict};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Symbol used for files without any top-level definition.
pub const MODULE_SYMBOL: &str = "<module>";

/// One indexed unit of source: a top-level definition or a whole module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol: String,
    pub content: String,
}

impl Chunk {
    /// Stable identifier derived from the location.
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.file_path, self.start_line, self.end_line)
    }

    /// Text handed to the scoring strategy.
    pub fn document(&self) -> String {
        format!("{}\n{}", self.symbol, self.content)
    }
}

/// Splits Python source into top-level symbol chunks.
pub struct Chunker {
    parser: Parser,
}

impl Chunker {
    pub fn new() -> Result<Self, ParseError> {
        let parser = LanguageConfig::python().parser()?;
        Ok(Self { parser })
    }

    /// Read `path` and chunk it, labelling chunks with `rel_path`.
    pub fn chunk_file(&mut self, path: &Path, rel_path: &str) -> Result<Vec<Chunk>, ParseError> {
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: rel_path.to_string(),
            source,
        })?;
        self.chunk_source(rel_path, &text)
    }

    pub fn chunk_source(&mut self, file_path: &str, text: &str) -> Result<Vec<Chunk>, ParseError> {
        let tree = parse_strict(&mut self.parser, text, file_path)?;
        let lines: Vec<&str> = text.lines().collect();
        let root = tree.root_node();

        let mut chunks = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let Some(def) = top_level_definition(child) else {
                continue;
            };
            let Some(symbol) = definition_name(def, text) else {
                continue;
            };
            let (start_line, end_line) = line_span(def);
            chunks.push(Chunk {
                file_path: file_path.to_string(),
                start_line,
                end_line,
                symbol,
                content: slice_lines(&lines, start_line, end_line),
            });
        }

        if chunks.is_empty() && !lines.is_empty() {
            chunks.push(Chunk {
                file_path: file_path.to_string(),
                start_line: 1,
                end_line: lines.len(),
                symbol: MODULE_SYMBOL.to_string(),
                content: text.to_string(),
            });
        }

        Ok(chunks)
    }
}

/// Unwraps decorators; returns the function or class node itself.
fn top_level_definition(node: Node) -> Option<Node> {
    match node.kind() {
        "function_definition" | "class_definition" => Some(node),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .filter(|d| matches!(d.kind(), "function_definition" | "class_definition")),
        _ => None,
    }
}

pub(crate) fn definition_name(node: Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(str::to_string)
}

/// 1-based inclusive line range of `node`.
fn line_span(node: Node) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = start.row + 1;
    // a node ending at column 0 stops on the previous line
    let end_line = if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    };
    (start_line, end_line)
}

fn slice_lines(lines: &[&str], start_line: usize, end_line: usize) -> String {
    let end = end_line.min(lines.len());
    lines[start_line - 1..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str) -> Vec<Chunk> {
        let mut chunker = Chunker::new().expect("Failed to initialize Chunker");
        chunker
            .chunk_source("pkg/mod.py", source)
            .expect("Failed to chunk Python code")
    }

    #[test]
    fn test_top_level_definitions() {
        let source_code = r#"import os

class MyClass:
    def my_method(self):
        print("Hello")

def my_function():
    pass

async def fetch():
    await thing()
"#;
        let chunks = chunk(source_code);
        let symbols: Vec<&str> = chunks.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MyClass", "my_function", "fetch"]);

        let class = &chunks[0];
        assert_eq!((class.start_line, class.end_line), (3, 5));
        assert!(class.content.starts_with("class MyClass:"));
        assert!(class.content.ends_with("print(\"Hello\")"));

        let func = &chunks[1];
        assert_eq!((func.start_line, func.end_line), (7, 8));
        assert_eq!(func.content, "def my_function():\n    pass");

        assert_eq!((chunks[2].start_line, chunks[2].end_line), (10, 11));
    }

    #[test]
    fn test_nested_functions_are_not_chunks() {
        let chunks = chunk("def outer():\n    def inner():\n        return 1\n    return inner\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol, "outer");
        assert_eq!(chunks[0].end_line, 4);
    }

    #[test]
    fn test_decorated_definition_starts_at_def() {
        let chunks = chunk("@cache\ndef cached():\n    return 1\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol, "cached");
        assert_eq!(chunks[0].start_line, 2);
        assert_eq!(chunks[0].end_line, 3);
    }

    #[test]
    fn test_module_fallback() {
        let chunks = chunk("VALUE = 1\nOTHER = 2\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol, MODULE_SYMBOL);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
        assert_eq!(chunks[0].content, "VALUE = 1\nOTHER = 2\n");
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        assert!(chunk("").is_empty());
    }

    #[test]
    fn test_parse_failure() {
        let mut chunker = Chunker::new().unwrap();
        let result = chunker.chunk_source("bad.py", "def broken(:\n    pass\n");
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_chunk_id_and_document() {
        let chunks = chunk("def hello():\n    return 'ok'\n");
        assert_eq!(chunks[0].id(), "pkg/mod.py:1:2");
        assert_eq!(chunks[0].document(), "hello\ndef hello():\n    return 'ok'");
    }
}
