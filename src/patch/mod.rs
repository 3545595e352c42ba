//! Function-body rewriting with reviewable diffs.
//!
//! Two interchangeable [`RewriteStrategy`] implementations exist: a
//! tree-sitter based one and an indentation based text fallback. The engine
//! picks one at construction; callers only see the active engine's name in
//! each [`PatchResult`]. The engine never writes to disk.
pub mod fallback;
pub mod structural;

use crate::indexer::ParseError;
use fallback::TextRewriter;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use structural::StructuralRewriter;
use thiserror::Error;
use tracing::{debug, warn};

/// Statement substituted for an empty body.
pub const NOOP_STATEMENT: &str = "pass";

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),
}

impl PatchError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PatchError::FileNotFound(_) => "file_not_found",
            PatchError::Io { .. } => "io_error",
            PatchError::ParseFailure(_) => "parse_failure",
            PatchError::FunctionNotFound(_) => "function_not_found",
            PatchError::UnsupportedTransform(_) => "unsupported_transform",
        }
    }
}

impl From<ParseError> for PatchError {
    fn from(e: ParseError) -> Self {
        PatchError::ParseFailure(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    pub ok: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
    pub diff: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_content: Option<String>,
    pub engine: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PatchResult {
    fn failure(
        engine: &'static str,
        file_path: &str,
        function_name: Option<&str>,
        err: &PatchError,
    ) -> Self {
        Self {
            ok: false,
            file_path: file_path.to_string(),
            function_name: function_name.map(str::to_string),
            change_type: None,
            diff: String::new(),
            updated_content: None,
            engine,
            error: Some(err.code().to_string()),
            detail: Some(err.to_string()),
        }
    }
}

/// A patch request as produced by a planner.
///
/// Only `{"type": "rewrite_function", "function_name", "new_body"}` is
/// supported; every other shape becomes [`TransformRequest::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformRequest {
    RewriteFunction {
        function_name: String,
        new_body: String,
    },
    #[serde(other)]
    Unsupported,
}

impl TransformRequest {
    /// Interpret a JSON request; malformed requests are unsupported.
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            debug!("Rejecting transform request: {e}");
            TransformRequest::Unsupported
        })
    }
}

/// Which rewrite strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Structural when the grammar loads, text otherwise.
    #[default]
    Auto,
    Structural,
    Fallback,
}

pub trait RewriteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Replace the body of `function_name` in `source` with `body`.
    ///
    /// `body` holds dedented, non-empty statement lines (blank lines inside
    /// are kept as empty strings).
    fn rewrite(&self, source: &str, function_name: &str, body: &[String])
    -> Result<String, PatchError>;
}

pub struct PatchEngine {
    strategy: Box<dyn RewriteStrategy>,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchEngine {
    /// Structural engine when available, text fallback otherwise.
    pub fn new() -> Self {
        let strategy: Box<dyn RewriteStrategy> = match StructuralRewriter::new() {
            Ok(s) => Box::new(s),
            Err(e) => {
                warn!("Structural rewriter unavailable, using text fallback: {e}");
                Box::new(TextRewriter)
            }
        };
        Self { strategy }
    }

    pub fn from_kind(kind: EngineKind) -> Result<Self, ParseError> {
        match kind {
            EngineKind::Auto => Ok(Self::new()),
            EngineKind::Structural => Ok(Self::with_strategy(Box::new(StructuralRewriter::new()?))),
            EngineKind::Fallback => Ok(Self::with_strategy(Box::new(TextRewriter))),
        }
    }

    pub fn with_strategy(strategy: Box<dyn RewriteStrategy>) -> Self {
        Self { strategy }
    }

    pub fn engine(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn apply_request<P: AsRef<Path>>(
        &self,
        file_path: P,
        request: &TransformRequest,
    ) -> PatchResult {
        match request {
            TransformRequest::RewriteFunction {
                function_name,
                new_body,
            } => self.apply(file_path, function_name, new_body),
            TransformRequest::Unsupported => {
                let label = path_label(file_path.as_ref());
                let err = PatchError::UnsupportedTransform(
                    "only rewrite_function is supported".to_string(),
                );
                PatchResult::failure(self.engine(), &label, None, &err)
            }
        }
    }

    /// Rewrite the body of `function_name` in `file_path`.
    ///
    /// Failures are reported in the result, never raised.
    pub fn apply<P: AsRef<Path>>(
        &self,
        file_path: P,
        function_name: &str,
        new_body: &str,
    ) -> PatchResult {
        let path = file_path.as_ref();
        let label = path_label(path);
        match self.try_apply(path, &label, function_name, new_body) {
            Ok((diff, updated)) => PatchResult {
                ok: true,
                file_path: label,
                function_name: Some(function_name.to_string()),
                change_type: Some("update".to_string()),
                diff,
                updated_content: Some(updated),
                engine: self.engine(),
                error: None,
                detail: None,
            },
            Err(e) => {
                debug!("Patch of {label}::{function_name} failed: {e}");
                PatchResult::failure(self.engine(), &label, Some(function_name), &e)
            }
        }
    }

    fn try_apply(
        &self,
        path: &Path,
        label: &str,
        function_name: &str,
        new_body: &str,
    ) -> Result<(String, String), PatchError> {
        let before = fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                PatchError::FileNotFound(label.to_string())
            } else {
                PatchError::Io {
                    path: label.to_string(),
                    source,
                }
            }
        })?;

        let body = normalize_body(new_body);
        let after = self.strategy.rewrite(&before, function_name, &body)?;
        Ok((unified_diff(&before, &after, label), after))
    }
}

fn path_label(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Line-based unified diff with `a/` and `b/` headers and three context lines.
pub fn unified_diff(before: &str, after: &str, label: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

/// Dedent `new_body` and drop surrounding blank lines.
///
/// An all-blank body becomes a single no-op statement. String literal
/// content spanning rows is kept exactly as written.
pub fn normalize_body(new_body: &str) -> Vec<String> {
    let raw: Vec<&str> = new_body.lines().collect();
    let inside = string_continuation_rows(&raw);
    let lines: Vec<(&str, bool)> = raw
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let ends_in_string = inside.get(i + 1).copied().unwrap_or(false);
            let text = if ends_in_string { *l } else { l.trim_end() };
            (text, inside[i])
        })
        .collect();
    let first = lines.iter().position(|(l, _)| !l.trim().is_empty());
    let last = lines.iter().rposition(|(l, _)| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return vec![NOOP_STATEMENT.to_string()];
    };
    let lines = &lines[first..=last];

    let mut prefix: Option<&str> = None;
    for (line, _) in lines.iter().filter(|(l, verbatim)| !verbatim && !l.trim().is_empty()) {
        let ws = leading_whitespace(line);
        prefix = Some(match prefix {
            None => ws,
            Some(p) => common_prefix(p, ws),
        });
    }
    let strip = prefix.map_or(0, str::len);

    lines
        .iter()
        .map(|(l, verbatim)| {
            if *verbatim {
                l.to_string()
            } else {
                l[leading_whitespace(l).len().min(strip)..].to_string()
            }
        })
        .collect()
}

/// Line terminator used by `source`.
pub(crate) fn line_ending(source: &str) -> &'static str {
    if source.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Marks the rows of `lines` that begin inside a triple-quoted string opened
/// on an earlier row.
///
/// Token-level scan for callers without a syntax tree: `#` comments and
/// single-quoted strings are skipped, backslash escapes are honoured.
pub(crate) fn string_continuation_rows<S: AsRef<str>>(lines: &[S]) -> Vec<bool> {
    let mut open: Option<&'static [u8]> = None;
    let mut rows = Vec::with_capacity(lines.len());

    for line in lines {
        rows.push(open.is_some());
        let bytes = line.as_ref().as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(delim) = open {
                if bytes[i] == b'\\' {
                    i += 2;
                } else if bytes[i..].starts_with(delim) {
                    open = None;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }
            match bytes[i] {
                b'#' => break,
                quote @ (b'"' | b'\'') => {
                    let triple: &'static [u8] = if quote == b'"' { b"\"\"\"" } else { b"'''" };
                    if bytes[i..].starts_with(triple) {
                        open = Some(triple);
                        i += 3;
                        continue;
                    }
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        i += if bytes[i] == b'\\' { 2 } else { 1 };
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }
    rows
}

pub(crate) fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Indent every non-empty line of `body` with `indent`.
///
/// Rows flagged in `verbatim` are string content and are copied unchanged.
pub(crate) fn indent_body(body: &[String], indent: &str, verbatim: &[bool]) -> Vec<String> {
    body.iter()
        .zip(verbatim.iter().copied().chain(std::iter::repeat(false)))
        .map(|(l, keep)| {
            if keep || l.is_empty() {
                l.clone()
            } else {
                format!("{indent}{l}")
            }
        })
        .collect()
}
