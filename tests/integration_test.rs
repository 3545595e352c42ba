/// End-to-end tests for the bugscope pipeline.
///
/// Tests the complete flow:
///   Config → CodeIntel → Index/Graph build → Search → Dependents → Patch → Write
use bugscope::config::Config;
use bugscope::context::CodeIntel;
use bugscope::fs_tools::{read_file, write_file};
use bugscope::indexer::scoring::ScoringMode;
use bugscope::patch::{EngineKind, PatchEngine, TransformRequest};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_scenario(dir: &Path) {
    fs::write(
        dir.join("a.py"),
        "from b import hello\n\ndef call():\n    return hello()\n",
    )
    .unwrap();
    fs::write(dir.join("b.py"), "def hello():\n    return 'ok'\n").unwrap();
}

/// Scenario from the bug-fixing workflow: search, impact, patch, persist.
#[test]
fn test_full_pipeline() {
    init_tracing();
    let temp_dir = tempdir().unwrap();
    let repo = temp_dir.path();
    write_scenario(repo);

    let ctx = CodeIntel::from_config(&Config::default()).unwrap();

    // 1. Index
    let stats = ctx.index.build(repo).unwrap();
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(stats.chunks, 2);

    // 2. Search
    let response = ctx.index.query("hello", ctx.config.search_top_k).unwrap();
    assert_eq!(response.mode, ScoringMode::Vector);
    assert!(
        response.results.iter().any(|r| r.file_path == "b.py"),
        "expected a hit in b.py, got {:?}",
        response.results
    );

    // 3. Dependents
    let graph_stats = ctx.graph.build(repo).unwrap();
    assert_eq!(graph_stats.nodes, 2);
    assert_eq!(graph_stats.edges, 1);
    assert_eq!(ctx.graph.get_dependents("b.py"), vec!["a.py"]);
    assert!(ctx.graph.get_dependents("a.py").is_empty());

    // 4. Patch
    let target = repo.join("b.py");
    let result = ctx.patcher.apply(&target, "hello", "return 'fixed'");
    assert!(result.ok, "patch failed: {:?}", result.detail);
    assert!(result.diff.contains("+    return 'fixed'"));
    assert_eq!(read_file(&target).content.as_deref(), Some("def hello():\n    return 'ok'\n"));

    // 5. Persist and re-index
    let updated = result.updated_content.unwrap();
    assert!(write_file(&target, &updated).ok);
    ctx.index.build(repo).unwrap();
    let hit = ctx.index.query("return 'fixed'", 1).unwrap();
    assert_eq!(hit.results[0].file_path, "b.py");
}

/// Lexical mode keeps the same result shape.
#[test]
fn test_lexical_pipeline() {
    let temp_dir = tempdir().unwrap();
    write_scenario(temp_dir.path());

    let config = Config {
        scoring: ScoringMode::Lexical,
        ..Config::default()
    };
    let ctx = CodeIntel::from_config(&config).unwrap();
    ctx.index.build(temp_dir.path()).unwrap();

    let response = ctx.index.query("hello", 5).unwrap();
    assert_eq!(response.mode, ScoringMode::Lexical);
    assert_eq!(response.results.len(), 2);
    // b.py mentions hello twice, a.py once
    assert_eq!(response.results[0].file_path, "b.py");
    assert_eq!(response.results[0].score, 2.0);
    assert_eq!(response.results[1].file_path, "a.py");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["mode"], "lexical");
    assert_eq!(json["results"][0]["line_range"], serde_json::json!([1, 2]));
}

/// A fresh index answers with an empty list.
#[test]
fn test_query_before_build() {
    let ctx = CodeIntel::from_config(&Config::default()).unwrap();
    let response = ctx.index.query("anything at all", 5).unwrap();
    assert!(response.results.is_empty());
}

/// Rebuilding an unchanged tree produces identical entries and rankings.
#[test]
fn test_rebuild_idempotence() {
    let temp_dir = tempdir().unwrap();
    write_scenario(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join("pkg")).unwrap();
    fs::write(
        temp_dir.path().join("pkg/tools.py"),
        "class Tool:\n    def run(self):\n        return hello()\n",
    )
    .unwrap();

    let ctx = CodeIntel::from_config(&Config::default()).unwrap();
    let first = ctx.index.build(temp_dir.path()).unwrap();
    let entries = ctx.index.entries();
    let ranking = ctx.index.query("run hello", 5).unwrap();

    let second = ctx.index.build(temp_dir.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(ctx.index.entries(), entries);
    assert_eq!(ctx.index.query("run hello", 5).unwrap(), ranking);
}

/// Both engines agree at the contract level.
#[test]
fn test_engine_parity() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("svc.py");
    let source = "import os\n\n\ndef load(path):\n    data = open(path).read()\n    return data\n\n\ndef save(path, data):\n    open(path, 'w').write(data)\n";
    fs::write(&path, source).unwrap();

    let structural = PatchEngine::from_kind(EngineKind::Structural).unwrap();
    let fallback = PatchEngine::from_kind(EngineKind::Fallback).unwrap();
    let body = "with open(path) as fh:\n    return fh.read()";

    let a = structural.apply(&path, "load", body);
    let b = fallback.apply(&path, "load", body);
    assert!(a.ok && b.ok);
    assert_eq!(a.updated_content, b.updated_content);
    assert_eq!(a.diff, b.diff);
    assert_ne!(a.engine, b.engine);

    let missing_a = structural.apply(&path, "nope", body);
    let missing_b = fallback.apply(&path, "nope", body);
    assert_eq!(missing_a.error, missing_b.error);
    assert_eq!(missing_a.error.as_deref(), Some("function_not_found"));
}

/// Requests arrive as JSON from the planner.
#[test]
fn test_json_requests() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("mod.py");
    fs::write(&path, "def foo(): return 1\n").unwrap();
    let engine = PatchEngine::new();

    let request = TransformRequest::from_json(&serde_json::json!({
        "type": "rewrite_function",
        "function_name": "foo",
        "new_body": "return 2",
    }));
    let result = engine.apply_request(&path, &request);
    assert!(result.ok);
    assert_eq!(result.updated_content.as_deref(), Some("def foo():\n    return 2\n"));

    let request = TransformRequest::from_json(&serde_json::json!({"type": "insert_line"}));
    let result = engine.apply_request(&path, &request);
    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some("unsupported_transform"));
    assert!(result.diff.is_empty());
}

/// Import cycles terminate and never report the queried file.
#[test]
fn test_cyclic_imports() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("a.py"), "import b\n").unwrap();
    fs::write(temp_dir.path().join("b.py"), "import a\n").unwrap();

    let ctx = CodeIntel::from_config(&Config::default()).unwrap();
    ctx.graph.build(temp_dir.path()).unwrap();
    assert_eq!(ctx.graph.get_dependents("a.py"), vec!["b.py"]);
    assert_eq!(ctx.graph.get_dependents("b.py"), vec!["a.py"]);
}

/// The SQLite-backed index does not duplicate rows across rebuilds.
#[test]
fn test_persistent_index() {
    let temp_dir = tempdir().unwrap();
    let repo = temp_dir.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    write_scenario(&repo);

    let config = Config {
        db_path: Some(temp_dir.path().join("index.db").to_string_lossy().to_string()),
        ..Config::default()
    };

    {
        let ctx = CodeIntel::from_config(&config).unwrap();
        ctx.index.build(&repo).unwrap();
        ctx.index.build(&repo).unwrap();
        assert_eq!(ctx.index.len(), 2);
    }

    let reopened = CodeIntel::from_config(&config).unwrap();
    assert_eq!(reopened.index.len(), 2);
    let response = reopened.index.query("hello", 5).unwrap();
    assert!(response.results.iter().any(|r| r.file_path == "b.py"));
}
