use super::ParseError;
use std::path::Path;
use tree_sitter::{Language, Node, Parser, Tree};

pub struct LanguageConfig {
    pub language: Language,
    pub extensions: &'static [&'static str],
    pub import_query: &'static str,
}

impl LanguageConfig {
    pub fn python() -> LanguageConfig {
        python_config()
    }

    /// Whether `path` carries one of this language's source extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Build a parser bound to this grammar.
    pub fn parser(&self) -> Result<Parser, ParseError> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

/// Parse `source` and reject trees that contain syntax errors.
pub fn parse_strict(parser: &mut Parser, source: &str, path: &str) -> Result<Tree, ParseError> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::NoTree(path.to_string()))?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ParseError::Syntax {
            path: path.to_string(),
            line,
        });
    }
    Ok(tree)
}

/// 1-based line of the first ERROR or MISSING node, in document order.
fn first_error_line(root: Node) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        import_query: r#"
(import_statement
  name: (dotted_name) @import)
(import_statement
  name: (aliased_import
    name: (dotted_name) @import))
(import_from_statement
  module_name: (dotted_name) @import)
(import_from_statement
  module_name: (relative_import
    (dotted_name) @import))
(future_import_statement) @future
"#,
    }
}
