use super::{PatchError, RewriteStrategy, indent_body, leading_whitespace, line_ending};
use crate::indexer::ParseError;
use crate::indexer::code_parser::definition_name;
use crate::indexer::languages::{LanguageConfig, parse_strict};
use tree_sitter::Node;

const INDENT_STEP: &str = "    ";

/// Rewrites function bodies through the tree-sitter syntax tree.
///
/// The signature, decorators, and everything outside the body block are kept
/// byte for byte.
#[derive(Debug)]
pub struct StructuralRewriter {
    _private: (),
}

impl StructuralRewriter {
    /// Fails when the grammar cannot be loaded into a parser.
    pub fn new() -> Result<Self, ParseError> {
        LanguageConfig::python().parser()?;
        Ok(Self { _private: () })
    }
}

impl RewriteStrategy for StructuralRewriter {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn rewrite(
        &self,
        source: &str,
        function_name: &str,
        body: &[String],
    ) -> Result<String, PatchError> {
        let mut parser = LanguageConfig::python().parser()?;
        let tree = parse_strict(&mut parser, source, "<target>")?;

        let def = find_function(tree.root_node(), source, function_name)
            .ok_or_else(|| PatchError::FunctionNotFound(function_name.to_string()))?;
        let block = def
            .child_by_field_name("body")
            .ok_or_else(|| PatchError::ParseFailure(format!("{function_name} has no body")))?;
        let colon = body_colon(def, block)
            .ok_or_else(|| PatchError::ParseFailure(format!("{function_name} has no ':'")))?;

        let body_tree = parse_strict(&mut parser, &body.join("\n"), "<new body>")?;
        let verbatim = string_rows(body_tree.root_node(), body.len());

        let def_indent = line_indent(source, def);
        let own_line = block.start_position().row > colon.end_position().row;
        let indent = if own_line {
            let existing = line_indent(source, block);
            if existing.len() > def_indent.len() && existing.starts_with(def_indent) {
                existing.to_string()
            } else {
                format!("{def_indent}{INDENT_STEP}")
            }
        } else {
            format!("{def_indent}{INDENT_STEP}")
        };
        let newline = line_ending(source);
        let rendered = indent_body(body, &indent, &verbatim).join(newline);

        let after_colon = colon.end_byte();
        let (start, replacement) = if own_line {
            // comments between the colon and the first statement belong to the old body
            let start = source[after_colon..]
                .find('\n')
                .map_or(source.len(), |i| after_colon + i + 1);
            (start, rendered)
        } else {
            (after_colon, format!("{newline}{rendered}"))
        };
        let end = block.end_byte();
        // blocks can swallow trailing newlines; keep them outside the span
        let end = start + source[start..end].trim_end().len();

        let mut updated = String::with_capacity(source.len() + replacement.len());
        updated.push_str(&source[..start]);
        updated.push_str(&replacement);
        updated.push_str(&source[end..]);
        Ok(updated)
    }
}

/// First `function_definition` named `name`, in pre-order.
pub(crate) fn find_function<'t>(root: Node<'t>, source: &str, name: &str) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "function_definition"
            && definition_name(node, source).as_deref() == Some(name)
        {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// The `:` token that opens `block`.
fn body_colon<'t>(def: Node<'t>, block: Node<'t>) -> Option<Node<'t>> {
    let mut cursor = def.walk();
    def.children(&mut cursor)
        .filter(|c| c.kind() == ":" && c.end_byte() <= block.start_byte())
        .last()
}

/// Rows (of a tree spanning `rows` lines) that start inside a multi-line
/// string literal.
fn string_rows(root: Node, rows: usize) -> Vec<bool> {
    let mut inside = vec![false; rows];
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let (first, last) = (node.start_position().row, node.end_position().row);
        if first == last {
            continue;
        }
        if node.kind() == "string" {
            for row in inside.iter_mut().take(last + 1).skip(first + 1) {
                *row = true;
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    inside
}

fn line_start(node: Node) -> usize {
    node.start_byte() - node.start_position().column
}

fn line_indent<'s>(source: &'s str, node: Node) -> &'s str {
    let start = line_start(node);
    let end = source[start..].find('\n').map_or(source.len(), |i| start + i);
    leading_whitespace(&source[start..end])
}
