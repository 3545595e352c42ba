//! File-level import graph.
//!
//! Nodes are repository-relative paths. An edge `a.py -> pkg/b.py` means
//! `a.py` imports `pkg.b`. Targets that match no file are kept as nodes
//! without outgoing edges.
use crate::indexer::ParseError;
use crate::indexer::relations::ImportExtractor;
use crate::indexer::walk::source_files;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

type Adjacency = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyImpact {
    pub file_path: String,
    pub dependents: Vec<String>,
}

#[derive(Debug, Default)]
struct GraphState {
    edges: Adjacency,
    reverse: Adjacency,
}

impl GraphState {
    fn add_node(&mut self, node: &str) {
        self.edges.entry(node.to_string()).or_default();
        self.reverse.entry(node.to_string()).or_default();
    }

    fn add_edge(&mut self, source: &str, target: &str) {
        self.add_node(source);
        self.add_node(target);
        if let Some(targets) = self.edges.get_mut(source) {
            targets.insert(target.to_string());
        }
        if let Some(importers) = self.reverse.get_mut(target) {
            importers.insert(source.to_string());
        }
    }

    fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    state: RwLock<GraphState>,
    exclude_dirs: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excludes(mut self, exclude_dirs: Vec<String>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    /// Discard the current graph and rebuild it from the files under `root`.
    ///
    /// Files that cannot be read or parsed stay in the graph as nodes without
    /// edges.
    pub fn build<P: AsRef<Path>>(&self, root: P) -> Result<GraphStats, ParseError> {
        let root = root.as_ref();
        let mut extractor = ImportExtractor::new()?;
        let mut state = GraphState::default();

        for file in source_files(root, &self.exclude_dirs) {
            state.add_node(&file.rel_path);

            let text = match fs::read_to_string(&file.path) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping unreadable {}: {e}", file.rel_path);
                    continue;
                }
            };
            let imports = match extractor.extract_imports(&text, &file.rel_path) {
                Ok(i) => i,
                Err(e) => {
                    warn!("Skipping imports of {}: {e}", file.rel_path);
                    continue;
                }
            };
            for import in imports {
                debug!(
                    "{}:{} imports {}",
                    file.rel_path, import.source_line, import.module
                );
                state.add_edge(&file.rel_path, &import.target_file);
            }
        }

        let stats = GraphStats {
            nodes: state.edges.len(),
            edges: state.edge_count(),
        };
        *self.state.write() = state;

        info!(
            "Built dependency graph: {} nodes, {} edges from {}",
            stats.nodes,
            stats.edges,
            root.display()
        );
        Ok(stats)
    }

    /// Every file that imports `file_path`, directly or transitively.
    ///
    /// Sorted and deduplicated; never contains `file_path` itself. Unknown
    /// paths have no dependents.
    pub fn get_dependents(&self, file_path: &str) -> Vec<String> {
        let state = self.state.read();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = state
            .reverse
            .get(file_path)
            .map(|importers| importers.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if let Some(importers) = state.reverse.get(node) {
                stack.extend(importers.iter().map(String::as_str));
            }
        }

        seen.remove(file_path);
        seen.into_iter().map(str::to_string).collect()
    }

    pub fn dependency_impact(&self, file_path: &str) -> DependencyImpact {
        DependencyImpact {
            file_path: file_path.to_string(),
            dependents: self.get_dependents(file_path),
        }
    }

    /// Direct import targets of `file_path`, sorted.
    pub fn imports_of(&self, file_path: &str) -> Vec<String> {
        self.state
            .read()
            .edges
            .get(file_path)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.state.read().edges.contains_key(file_path)
    }

    pub fn node_count(&self) -> usize {
        self.state.read().edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo(files: &[(&str, &str)]) -> tempfile::TempDir {
        let temp_dir = tempdir().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_transitive_dependents() {
        let dir = repo(&[
            ("a.py", "import b\n"),
            ("b.py", "import c\n"),
            ("c.py", "VALUE = 1\n"),
        ]);
        let graph = DependencyGraph::new();
        let stats = graph.build(dir.path()).unwrap();
        assert_eq!(stats, GraphStats { nodes: 3, edges: 2 });

        assert_eq!(graph.get_dependents("c.py"), vec!["a.py", "b.py"]);
        assert_eq!(graph.get_dependents("b.py"), vec!["a.py"]);
        assert!(graph.get_dependents("a.py").is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let dir = repo(&[("a.py", "import b\n"), ("b.py", "import a\n")]);
        let graph = DependencyGraph::new();
        graph.build(dir.path()).unwrap();

        assert_eq!(graph.get_dependents("a.py"), vec!["b.py"]);
        assert_eq!(graph.get_dependents("b.py"), vec!["a.py"]);
    }

    #[test]
    fn test_diamond_has_no_duplicates() {
        let dir = repo(&[
            ("top.py", "import left\nimport right\n"),
            ("left.py", "import base\n"),
            ("right.py", "import base\n"),
            ("base.py", ""),
        ]);
        let graph = DependencyGraph::new();
        graph.build(dir.path()).unwrap();
        assert_eq!(
            graph.get_dependents("base.py"),
            vec!["left.py", "right.py", "top.py"]
        );
    }

    #[test]
    fn test_unknown_file_has_no_dependents() {
        let graph = DependencyGraph::new();
        assert!(graph.get_dependents("missing.py").is_empty());
    }

    #[test]
    fn test_phantom_targets_are_nodes() {
        let dir = repo(&[("a.py", "import os\nfrom pkg.util import helper\n")]);
        let graph = DependencyGraph::new();
        let stats = graph.build(dir.path()).unwrap();
        assert_eq!(stats, GraphStats { nodes: 3, edges: 2 });
        assert!(graph.contains("os.py"));
        assert!(graph.imports_of("os.py").is_empty());
        assert_eq!(graph.imports_of("a.py"), vec!["os.py", "pkg/util.py"]);
        assert_eq!(graph.get_dependents("pkg/util.py"), vec!["a.py"]);
    }

    #[test]
    fn test_future_import_is_an_edge() {
        let dir = repo(&[
            ("a.py", "from __future__ import annotations\nimport b\n"),
            ("b.py", "from __future__ import annotations\n"),
        ]);
        let graph = DependencyGraph::new();
        let stats = graph.build(dir.path()).unwrap();
        assert_eq!(stats, GraphStats { nodes: 3, edges: 3 });
        assert_eq!(graph.imports_of("a.py"), vec!["__future__.py", "b.py"]);
        assert_eq!(graph.get_dependents("__future__.py"), vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_nested_package_paths() {
        let dir = repo(&[
            ("pkg/util.py", "def helper():\n    return 1\n"),
            ("app.py", "from pkg.util import helper\n"),
        ]);
        let graph = DependencyGraph::new();
        graph.build(dir.path()).unwrap();
        assert_eq!(graph.get_dependents("pkg/util.py"), vec!["app.py"]);
    }

    #[test]
    fn test_parse_failure_keeps_node_without_edges() {
        let dir = repo(&[("a.py", "import b\ndef broken(:\n"), ("b.py", "")]);
        let graph = DependencyGraph::new();
        let stats = graph.build(dir.path()).unwrap();
        assert_eq!(stats, GraphStats { nodes: 2, edges: 0 });
        assert!(graph.contains("a.py"));
        assert!(graph.get_dependents("b.py").is_empty());
    }

    #[test]
    fn test_rebuild_clears_previous_state() {
        let dir = repo(&[("a.py", "import b\n"), ("b.py", "")]);
        let graph = DependencyGraph::new();
        graph.build(dir.path()).unwrap();
        assert_eq!(graph.get_dependents("b.py"), vec!["a.py"]);

        fs::write(dir.path().join("a.py"), "VALUE = 1\n").unwrap();
        let stats = graph.build(dir.path()).unwrap();
        assert_eq!(stats.edges, 0);
        assert!(graph.get_dependents("b.py").is_empty());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_dependency_impact() {
        let dir = repo(&[
            ("a.py", "from b import hello\n\ndef call():\n    return hello()\n"),
            ("b.py", "def hello():\n    return 'ok'\n"),
        ]);
        let graph = DependencyGraph::new();
        graph.build(dir.path()).unwrap();
        let impact = graph.dependency_impact("b.py");
        assert_eq!(impact.file_path, "b.py");
        assert_eq!(impact.dependents, vec!["a.py"]);
    }
}
